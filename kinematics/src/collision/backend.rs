use super::types::{CapsuleSpec, ColliderId, Penetration, QueryFilter, SweepHit, Transform, Vec3};

/// Geometric queries and pose bookkeeping the motion solver needs from a collision world.
///
/// Implementations must:
/// - never report sensor (trigger) colliders,
/// - honour `QueryFilter::exclude` so a character never collides with its own body,
/// - be deterministic: the same scene and the same query always give the same answer in the
///   same order.
///
/// Capsule poses passed to the queries are the pose of the capsule *centre*; the capsule axis is
/// the pose's local +Y.
pub trait CollisionBackend {
    /// Colliders overlapping a capsule at `pose`.
    fn overlap(
        &self,
        pose: &Transform,
        capsule: &CapsuleSpec,
        filter: &QueryFilter,
    ) -> Vec<ColliderId>;

    /// Sweep a capsule from `pose` along the unit `direction` up to `max_distance`.
    ///
    /// Returns every hit, ordered by increasing distance. Shapes already overlapping the capsule
    /// at `pose` are reported with a distance of zero.
    fn sweep(
        &self,
        pose: &Transform,
        capsule: &CapsuleSpec,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Vec<SweepHit>;

    /// Minimum translation that moves a capsule at `pose` out of `other` at its current pose.
    ///
    /// `None` when the shapes do not overlap or `other` is unknown.
    fn penetration(
        &self,
        pose: &Transform,
        capsule: &CapsuleSpec,
        other: ColliderId,
    ) -> Option<Penetration>;

    fn contains(&self, id: ColliderId) -> bool;

    /// Current world pose of a collider.
    fn pose(&self, id: ColliderId) -> Option<Transform>;

    /// Place a collider instantly. Interpolation consumers see no transition.
    fn teleport(&mut self, id: ColliderId, pose: Transform);

    /// Authoritative kinematic move: the pose before the call becomes the collider's previous
    /// pose so interpolation consumers see a single transition.
    fn move_to(&mut self, id: ColliderId, pose: Transform);
}
