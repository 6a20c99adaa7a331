/*!
Core collision types and math aliases shared by the collision submodules.

This module intentionally contains no algorithms. It defines the data types
exchanged between:
- the collision backends (rapier-backed scene, analytic half-space scene)
- the character motion solver (sweep-and-slide, depenetration, ground probe)
- the platform kinematics and the tick orchestrator

Conventions
- Distances are in meters, time in seconds, angles in degrees unless a field
  name says otherwise.
- Capsules are aligned with the local +Y axis of the pose they are queried at.
*/

use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::bitmask_flags::BitmaskFlags;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// Collision layer mask. Bit `i` set means "interacts with layer `i`".
pub type CollisionLayers = BitmaskFlags<u32>;

/// Stable identifier of a collider inside a [`CollisionBackend`](super::CollisionBackend).
///
/// Ids are handed out by the backend on insertion and never reused, so they are safe to
/// keep as keys across ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColliderId(pub u32);

/// A rigid transform (isometry) in world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::zeros())
    }
}

impl Transform {
    #[inline]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::identity(),
        }
    }

    /// Local +Y expressed in world space.
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::y()
    }

    /// Convert to nalgebra `Isometry3` for use with parry3d narrow-phase queries.
    #[inline]
    pub fn iso(&self) -> Iso {
        Iso::from_parts(
            na::Translation3::new(self.translation.x, self.translation.y, self.translation.z),
            self.rotation,
        )
    }

    #[inline]
    pub fn from_iso(iso: &Iso) -> Self {
        Self {
            translation: iso.translation.vector,
            rotation: iso.rotation,
        }
    }
}

/// Capsule specification for kinematic actors.
///
/// half_height is the half-length of the cylinder section (aligned with +Y),
/// so the total capsule height is 2*half_height + 2*radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleSpec {
    pub radius: f32,
    pub half_height: f32,
}

impl CapsuleSpec {
    /// World-space centres of the two cap spheres for a capsule placed at `pose`.
    #[inline]
    pub fn segment(&self, pose: &Transform) -> (Vec3, Vec3) {
        let axis = pose.up() * self.half_height;
        (pose.translation + axis, pose.translation - axis)
    }
}

/// Which colliders a query may report.
///
/// Sensor (trigger) colliders are never reported regardless of the filter.
#[derive(Clone, Copy, Debug)]
pub struct QueryFilter {
    /// Layers the querying shape interacts with.
    pub mask: CollisionLayers,
    /// Collider skipped by the query, normally the querying character's own body.
    pub exclude: Option<ColliderId>,
}

impl QueryFilter {
    #[inline]
    pub fn new(mask: CollisionLayers, exclude: Option<ColliderId>) -> Self {
        Self { mask, exclude }
    }

    /// True when a collider with `id` and `layers` should be considered by the query.
    #[inline]
    pub fn accepts(&self, id: ColliderId, layers: CollisionLayers) -> bool {
        self.exclude != Some(id) && self.mask.intersects(layers)
    }
}

/// A single result of a capsule sweep.
#[derive(Clone, Copy, Debug)]
pub struct SweepHit {
    pub collider: ColliderId,
    /// World-space contact point on the hit collider.
    pub point: Vec3,
    /// World-space surface normal of the hit collider, pointing toward the swept shape.
    pub normal: Vec3,
    /// Distance travelled along the sweep direction before contact (0 when starting overlapped).
    pub distance: f32,
}

/// Minimum translation separating two shapes.
#[derive(Clone, Copy, Debug)]
pub struct Penetration {
    /// Unit direction to move the first shape along.
    pub direction: Vec3,
    /// Overlap depth along `direction` (meters, positive).
    pub depth: f32,
}
