use rapier3d::prelude::{Collider, ColliderBuilder, HalfSpace, SharedShape, UnitVector};
use serde::{Deserialize, Serialize};

use super::types::{CollisionLayers, Quat, Transform, Vec3};

/// Canonical, schema-agnostic definition of a world collider.
///
/// Scenario files map to this type, then the scene inserts it with
/// [`RapierScene::insert_statics`](super::scene::RapierScene::insert_statics).
///
/// Conventions
/// - Units are meters.
/// - Rotation is a unit quaternion.
/// - For planes, we use a pose-derived normal: `normal = rotation * +Y`,
///   and compute `dist = dot(normal, translation) + offset_along_normal`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldStaticDef {
    /// Stable unique identifier used to ensure deterministic insertion order.
    pub id: u32,
    /// World-space translation.
    pub translation: Vec3,
    /// World-space rotation (unit quaternion).
    #[serde(default = "Quat::identity")]
    pub rotation: Quat,
    /// Collider shape parameters.
    pub shape: ColliderShapeDef,
    /// Layers this collider belongs to.
    #[serde(default = "CollisionLayers::all")]
    pub layers: CollisionLayers,
    /// Trigger volumes are stored but never reported by motion queries.
    #[serde(default)]
    pub sensor: bool,
}

impl WorldStaticDef {
    #[inline]
    pub fn transform(&self) -> Transform {
        Transform::new(self.translation, self.rotation)
    }
}

/// Supported collider shapes.
///
/// Keep this intentionally small and deterministic. Extend as needed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColliderShapeDef {
    /// Infinite plane (half-space).
    ///
    /// This is represented by an offset along the plane normal.
    /// The plane normal is derived from the pose as `rotation * +Y`.
    Plane {
        /// Offset along the plane normal (meters).
        #[serde(default)]
        offset_along_normal: f32,
    },

    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vec3 },

    /// Sphere/ball (meters).
    Sphere { radius: f32 },

    /// Y-aligned capsule (meters).
    CapsuleY { radius: f32, half_height: f32 },

    /// Y-aligned cylinder (meters).
    CylinderY { radius: f32, half_height: f32 },

    /// Y-aligned cone (meters).
    ConeY { radius: f32, half_height: f32 },

    /// Rounded cuboid (meters).
    ///
    /// `border_radius` rounds all edges/corners.
    RoundCuboid {
        half_extents: Vec3,
        border_radius: f32,
    },
}

/// Build a Rapier collider from a shape definition placed at `pose`.
///
/// Planes are built in world space (the half-space sits at `normal * dist` with identity
/// rotation), every other shape takes `pose` as its position.
pub fn collider_from_def(shape: &ColliderShapeDef, pose: &Transform, sensor: bool) -> Collider {
    let mut collider = match shape {
        ColliderShapeDef::Plane {
            offset_along_normal,
        } => {
            // Derive world-space plane normal from pose rotation: n = R * +Y.
            // Then compute plane dist: n ⋅ x = dist, where x is any point on the plane.
            let n = pose.rotation * Vec3::y();
            let dist = n.dot(&pose.translation) + *offset_along_normal;
            let unit_n = UnitVector::new_normalize(n);

            let mut plane = ColliderBuilder::new(SharedShape::new(HalfSpace::new(unit_n)))
                .sensor(sensor)
                .build();
            plane.set_position(Transform::from_translation(unit_n.into_inner() * dist).iso());
            return plane;
        }

        ColliderShapeDef::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }

        ColliderShapeDef::Sphere { radius } => ColliderBuilder::ball(*radius),

        ColliderShapeDef::CapsuleY {
            radius,
            half_height,
        } => ColliderBuilder::capsule_y(*half_height, *radius),

        ColliderShapeDef::CylinderY {
            radius,
            half_height,
        } => ColliderBuilder::cylinder(*half_height, *radius),

        ColliderShapeDef::ConeY {
            radius,
            half_height,
        } => ColliderBuilder::cone(*half_height, *radius),

        ColliderShapeDef::RoundCuboid {
            half_extents,
            border_radius,
        } => ColliderBuilder::round_cuboid(
            half_extents.x,
            half_extents.y,
            half_extents.z,
            *border_radius,
        ),
    }
    .sensor(sensor)
    .build();

    collider.set_position(pose.iso());
    collider
}
