//! Thin wrappers over parry3d queries for a Y-aligned capsule against an arbitrary shape.
//!
//! parry reports "unsupported shape pair" as an error; every wrapper here folds that into
//! "no contact" so an exotic shape never stalls the tick.

use rapier3d::parry::{
    query::{self, ShapeCastOptions},
    shape::{Capsule, Shape},
};

use super::types::{CapsuleSpec, Iso, Penetration, Transform, Vec3};

#[inline]
pub fn capsule_shape(spec: &CapsuleSpec) -> Capsule {
    Capsule::new_y(spec.half_height, spec.radius)
}

/// Contact found by [`cast_capsule`], expressed in world space.
#[derive(Clone, Copy, Debug)]
pub struct CastContact {
    pub point: Vec3,
    /// Outward normal of the other shape at the contact.
    pub normal: Vec3,
    pub distance: f32,
}

/// Cast a capsule along the unit `direction` against a static shape.
///
/// - `capsule_pose`: the capsule's starting pose in world space.
/// - `max_distance`: the maximum travel to consider (meters). Since `direction` is unit length
///   the time of impact reported by parry is the travelled distance.
/// - A shape already overlapping the capsule is reported at distance zero.
pub fn cast_capsule(
    capsule_pose: &Transform,
    capsule: &Capsule,
    direction: Vec3,
    max_distance: f32,
    other_iso: &Iso,
    other: &dyn Shape,
) -> Option<CastContact> {
    let mut opts = ShapeCastOptions::with_max_time_of_impact(max_distance);
    opts.stop_at_penetration = true;

    let hit = query::cast_shapes(
        &capsule_pose.iso(),
        &direction,
        capsule as &dyn Shape,
        other_iso,
        &Vec3::zeros(),
        other,
        opts,
    )
    .ok()??;

    // Witness and normal are local to the other shape; it does not move during the cast.
    let normal = other_iso.rotation * hit.normal2.into_inner();
    let point = (other_iso * hit.witness2).coords;

    Some(CastContact {
        point,
        normal,
        distance: hit.time_of_impact.max(0.0),
    })
}

/// Strict overlap test (touching shapes do not count).
pub fn capsule_intersects(
    capsule_pose: &Transform,
    capsule: &Capsule,
    other_iso: &Iso,
    other: &dyn Shape,
) -> bool {
    query::intersection_test(&capsule_pose.iso(), capsule as &dyn Shape, other_iso, other)
        .unwrap_or(false)
}

/// Penetration of the capsule into `other`, as the translation that separates the capsule.
pub fn capsule_penetration(
    capsule_pose: &Transform,
    capsule: &Capsule,
    other_iso: &Iso,
    other: &dyn Shape,
) -> Option<Penetration> {
    let contact = query::contact(
        &capsule_pose.iso(),
        capsule as &dyn Shape,
        other_iso,
        other,
        0.0,
    )
    .ok()??;

    if contact.dist >= 0.0 {
        return None;
    }

    // normal1 points out of the capsule toward the other shape; separate along its opposite.
    Some(Penetration {
        direction: -contact.normal1.into_inner(),
        depth: -contact.dist,
    })
}
