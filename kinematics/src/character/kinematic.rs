use log::{debug, trace};

use super::{CharacterController, state::MovementState};
use crate::{
    collision::{ColliderId, CollisionBackend, SweepHit, Transform, Vec3},
    constants::{DIST_EPS, MIN_MOVE_SQ, OVERLAP_DISTANCE_EPS},
    utils::{angle_deg, is_finite, is_negligible},
};

impl CharacterController {
    /// Nearest blocking hit when sweeping the capsule from the root pose `root` along the unit
    /// `direction` for up to `distance`.
    ///
    /// - The character's own body is never reported, nor is `ignore`.
    /// - Hits that start overlapped get their normal from the penetration query, since a
    ///   zero-distance sweep normal is unreliable.
    /// - Surfaces the capsule is moving away from (`direction · normal >= 0`) do not block.
    pub(crate) fn closest_hit<B: CollisionBackend>(
        &self,
        backend: &B,
        root: &Transform,
        direction: Vec3,
        distance: f32,
        ignore: Option<ColliderId>,
    ) -> Option<SweepHit> {
        let pose = self.body_pose(root);
        let capsule = self.capsule();
        let body = self.body();

        backend
            .sweep(&pose, &capsule, direction, distance, &self.filter())
            .into_iter()
            .filter(|hit| hit.collider != body && Some(hit.collider) != ignore)
            .filter_map(|mut hit| {
                if hit.distance <= OVERLAP_DISTANCE_EPS {
                    if let Some(pen) = backend.penetration(&pose, &capsule, hit.collider) {
                        hit.normal = pen.direction;
                    }
                }
                (direction.dot(&hit.normal) < 0.0).then_some(hit)
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Sweep-and-slide the target pose by `distance`.
    ///
    /// Each iteration advances to `contact_offset` short of the nearest hit and redirects the
    /// leftover along the surface tangent. In `Walk`, sliding never climbs a surface steeper than
    /// the stable angle. When the iteration budget runs out with distance left over, the
    /// exhaustion flags decide whether the achieved move and the leftover are kept.
    pub(crate) fn character_move<B: CollisionBackend>(&mut self, backend: &B, distance: Vec3) {
        self.character_move_ignoring(backend, distance, None);
    }

    /// [`character_move`](Self::character_move) that passes through `ignore`.
    ///
    /// Used to ride a platform: the deck has not moved yet when the rider is carried, so a
    /// descending deck would otherwise block its own rider.
    pub(crate) fn character_move_ignoring<B: CollisionBackend>(
        &mut self,
        backend: &B,
        distance: Vec3,
        ignore: Option<ColliderId>,
    ) {
        if !is_finite(&distance) {
            debug!(
                "character {:?}: dropping non-finite move {distance:?}",
                self.body()
            );
            return;
        }
        if is_negligible(&distance) {
            return;
        }

        let contact_offset = self.config().contact_offset;
        let stable_angle = self.config().stable_angle_deg;
        let budget = self.config().velocity_iterations;
        let discard_position = self.config().discard_position_on_exhaustion;
        let discard_remainder = self.config().discard_remainder_on_exhaustion;
        let walking = self.movement_state() == MovementState::Walk;

        let up = self.target.up();
        let start = self.target.translation;
        let mut position = start;
        let mut remaining = distance;
        let mut iterations = 0;

        while iterations < budget && remaining.norm_squared() > MIN_MOVE_SQ {
            let magnitude = remaining.norm();
            let direction = remaining / magnitude;
            let probe = Transform::new(position, self.target.rotation);

            let Some(hit) =
                self.closest_hit(backend, &probe, direction, magnitude + contact_offset, ignore)
            else {
                position += remaining;
                remaining = Vec3::zeros();
                break;
            };

            let advance = hit.distance - contact_offset;
            position += direction * advance;
            let left = (magnitude - advance).max(0.0);

            let tangent = hit
                .normal
                .cross(&hit.normal.cross(&direction))
                .try_normalize(DIST_EPS)
                .unwrap_or_else(Vec3::zeros);
            remaining = tangent * (tangent.dot(&direction) * left);

            if walking && angle_deg(&up, &hit.normal) > stable_angle {
                let climb = remaining.dot(&up);
                if climb > 0.0 {
                    remaining -= up * climb;
                }
            }

            trace!(
                "character {:?}: slide off {:?} at {:.4}, {:.4} left",
                self.body(),
                hit.collider,
                hit.distance,
                remaining.norm()
            );
            iterations += 1;
        }

        if iterations >= budget && remaining.norm_squared() > MIN_MOVE_SQ {
            debug!(
                "character {:?}: slide budget of {budget} exhausted with {:.4} left",
                self.body(),
                remaining.norm()
            );
            if discard_position {
                position = start;
            }
            if !discard_remainder {
                position += remaining;
            }
        }

        self.target.translation = position;
    }

    /// Push the target pose out of everything it overlaps, `contact_offset` clear of each
    /// surface, for up to `depenetration_iterations` passes.
    pub(crate) fn solve_overlap<B: CollisionBackend>(&mut self, backend: &B) {
        let contact_offset = self.config().contact_offset;
        let capsule = self.capsule();
        let filter = self.filter();

        for _ in 0..self.config().depenetration_iterations {
            let overlaps = backend.overlap(&self.body_pose(&self.target), &capsule, &filter);
            if overlaps.is_empty() {
                break;
            }

            for other in overlaps {
                let pose = self.body_pose(&self.target);
                if let Some(pen) = backend.penetration(&pose, &capsule, other) {
                    trace!(
                        "character {:?}: depenetrate from {other:?} by {:.4}",
                        self.body(),
                        pen.depth
                    );
                    self.target.translation += pen.direction * (pen.depth + contact_offset);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        character::CharacterConfig,
        collision::{AnalyticScene, CollisionLayers},
    };

    fn character(scene: &mut AnalyticScene, feet: Vec3, config: CharacterConfig) -> CharacterController {
        let body = scene.insert_body(Transform::from_translation(feet), CollisionLayers::all());
        CharacterController::new(body, config, Transform::from_translation(feet))
            .expect("valid config")
    }

    #[test]
    fn free_move_is_delivered_exactly() {
        let mut scene = AnalyticScene::new();
        let mut c = character(&mut scene, Vec3::zeros(), CharacterConfig::default());
        let d = Vec3::new(1.0, 2.0, -3.0);
        c.character_move(&scene, d);
        assert!((c.target.translation - d).norm() < 1.0e-6);
    }

    #[test]
    fn non_finite_or_tiny_moves_do_nothing() {
        let mut scene = AnalyticScene::new();
        let mut c = character(&mut scene, Vec3::zeros(), CharacterConfig::default());
        c.character_move(&scene, Vec3::new(f32::NAN, 0.0, 0.0));
        c.character_move(&scene, Vec3::new(1.0e-6, 0.0, 0.0));
        assert_eq!(c.target.translation, Vec3::zeros());
    }

    #[test]
    fn stops_contact_offset_short_of_the_floor() {
        let mut scene = AnalyticScene::new();
        scene.insert_half_space(Vec3::zeros(), Vec3::y(), CollisionLayers::all());
        let mut c = character(&mut scene, Vec3::new(0.0, 1.0, 0.0), CharacterConfig::default());

        c.character_move(&scene, Vec3::new(0.0, -3.0, 0.0));
        // Feet at y = 0 put the capsule bottom exactly one contact offset above the floor.
        assert!(c.target.translation.y.abs() < 1.0e-5);
    }

    #[test]
    fn slides_along_a_floor_when_moving_diagonally_down() {
        let mut scene = AnalyticScene::new();
        scene.insert_half_space(Vec3::zeros(), Vec3::y(), CollisionLayers::all());
        let mut c = character(&mut scene, Vec3::new(0.0, 0.5, 0.0), CharacterConfig::default());

        c.character_move(&scene, Vec3::new(1.0, -1.0, 0.0));
        let p = c.target.translation;
        // The contact offset is kept along the sweep direction, so the capsule ends up
        // `0.02 * cos(45°)` above the floor.
        let co = CharacterConfig::default().contact_offset;
        assert!((p.y - (co * std::f32::consts::FRAC_1_SQRT_2 - co)).abs() < 1.0e-4);
        // Whatever was not spent reaching the floor slides on along +X.
        assert!((p.x - 1.0).abs() < 1.0e-4);
    }

    #[test]
    fn ignored_collider_is_passed_through_while_others_still_block() {
        let mut scene = AnalyticScene::new();
        let deck = scene.insert_half_space(Vec3::zeros(), Vec3::y(), CollisionLayers::all());
        scene.insert_half_space(Vec3::new(2.0, 0.0, 0.0), -Vec3::x(), CollisionLayers::all());
        let mut c = character(&mut scene, Vec3::zeros(), CharacterConfig::default());

        c.character_move_ignoring(&scene, Vec3::new(3.0, -0.5, 0.0), Some(deck));
        let p = c.target.translation;
        // The deck no longer holds the capsule up, but the wall still stops it.
        assert!((p.y + 0.5).abs() < 1.0e-4, "sank to {}", p.y);
        assert!(p.x < 1.5 && p.x > 1.45, "stopped at {}", p.x);

        let mut held = character(&mut scene, Vec3::zeros(), CharacterConfig::default());
        held.character_move(&scene, Vec3::new(0.0, -0.5, 0.0));
        assert!(held.target.translation.y.abs() < 1.0e-5);
    }

    #[test]
    fn walking_does_not_climb_steep_walls() {
        let mut scene = AnalyticScene::new();
        let wall_normal = Vec3::new(-1.0, 0.2, 0.0).normalize();
        scene.insert_half_space(Vec3::new(1.0, 0.0, 0.0), wall_normal, CollisionLayers::all());
        let mut c = character(&mut scene, Vec3::zeros(), CharacterConfig::default());

        c.character_move(&scene, Vec3::new(2.0, 0.0, 0.0));
        assert!(c.target.translation.y <= 1.0e-6);
        assert!(c.target.translation.x < 1.0);
    }

    #[test]
    fn exhaustion_discards_the_move_by_default() {
        let mut scene = AnalyticScene::new();
        scene.insert_half_space(Vec3::zeros(), Vec3::y(), CollisionLayers::all());
        let config = CharacterConfig {
            velocity_iterations: 1,
            ..CharacterConfig::default()
        };
        let start = Vec3::new(0.0, 0.5, 0.0);
        let mut c = character(&mut scene, start, config);

        c.character_move(&scene, Vec3::new(1.0, -1.0, 0.0));
        assert_eq!(c.target.translation, start);
    }

    #[test]
    fn exhaustion_reverts_only_the_exhausted_call() {
        let mut scene = AnalyticScene::new();
        scene.insert_half_space(Vec3::zeros(), Vec3::y(), CollisionLayers::all());
        let config = CharacterConfig {
            velocity_iterations: 1,
            ..CharacterConfig::default()
        };
        let mut c = character(&mut scene, Vec3::new(0.0, 0.5, 0.0), config);

        c.character_move(&scene, Vec3::new(0.0, 0.0, 2.0));
        let carried = c.target.translation;
        c.character_move(&scene, Vec3::new(1.0, -1.0, 0.0));
        assert_eq!(c.target.translation, carried);
        assert_ne!(c.target.translation, c.snapshot.translation);
    }

    #[test]
    fn exhaustion_can_keep_the_partial_move() {
        let mut scene = AnalyticScene::new();
        scene.insert_half_space(Vec3::zeros(), Vec3::y(), CollisionLayers::all());
        let config = CharacterConfig {
            velocity_iterations: 1,
            discard_position_on_exhaustion: false,
            discard_remainder_on_exhaustion: true,
            ..CharacterConfig::default()
        };
        let mut c = character(&mut scene, Vec3::new(0.0, 0.5, 0.0), config);

        c.character_move(&scene, Vec3::new(1.0, -1.0, 0.0));
        let p = c.target.translation;
        let co = CharacterConfig::default().contact_offset;
        assert!((p.x - (0.52 - co * std::f32::consts::FRAC_1_SQRT_2)).abs() < 1.0e-4);
        assert!(p.y < 0.0);
    }

    #[test]
    fn depenetration_pushes_out_by_depth_plus_offset() {
        let mut scene = AnalyticScene::new();
        scene.insert_half_space(Vec3::zeros(), Vec3::y(), CollisionLayers::all());
        let depth = 0.3;
        let co = CharacterConfig::default().contact_offset;
        let start = Vec3::new(0.0, -depth - co, 0.0);
        let mut c = character(&mut scene, start, CharacterConfig::default());

        c.solve_overlap(&scene);
        let moved = c.target.translation - start;
        assert!((moved - Vec3::new(0.0, depth + co, 0.0)).norm() < 1.0e-5);
    }

    #[test]
    fn depenetration_budget_of_zero_leaves_overlaps() {
        let mut scene = AnalyticScene::new();
        scene.insert_half_space(Vec3::zeros(), Vec3::y(), CollisionLayers::all());
        let config = CharacterConfig {
            depenetration_iterations: 0,
            ..CharacterConfig::default()
        };
        let start = Vec3::new(0.0, -0.5, 0.0);
        let mut c = character(&mut scene, start, config);
        c.solve_overlap(&scene);
        assert_eq!(c.target.translation, start);
    }

    #[test]
    fn closest_hit_skips_own_body_and_receding_surfaces() {
        let mut scene = AnalyticScene::new();
        let floor = scene.insert_half_space(Vec3::zeros(), Vec3::y(), CollisionLayers::all());
        let c = character(&mut scene, Vec3::new(0.0, 1.0, 0.0), CharacterConfig::default());

        let root = Transform::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let down = c.closest_hit(&scene, &root, -Vec3::y(), 5.0, None).expect("floor below");
        assert_eq!(down.collider, floor);
        assert!((down.distance - 1.02).abs() < 1.0e-5);

        assert!(c.closest_hit(&scene, &root, Vec3::y(), 5.0, None).is_none());
    }
}
