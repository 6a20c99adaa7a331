use log::trace;

use super::{CharacterController, state::GroundReport};
use crate::{
    collision::CollisionBackend,
    events::CharacterEvent,
    utils::{angle_deg, project_on_plane},
};

/// Probe reach multiplier applied to the contact offset.
const GROUND_PROBE_SCALE: f32 = 1.5;

/// `tan` is unbounded at 90°; the probe expansion uses at most this angle.
const MAX_PROBE_EXPANSION_DEG: f32 = 89.0;

impl CharacterController {
    /// Probe below the feet, classify the ground, snap onto stable ground and fire the landing
    /// transition.
    ///
    /// While a forced-unground window is active the probe is skipped and the character reports
    /// no ground.
    pub(crate) fn detect_ground<B: CollisionBackend>(
        &mut self,
        dt: f32,
        backend: &B,
        events: &mut Vec<CharacterEvent>,
    ) {
        if let Some(timer) = self.unground.as_mut() {
            timer.elapsed += dt;
            if timer.elapsed >= timer.duration {
                self.unground = None;
            }
            self.ground.clear();
            return;
        }

        let was_grounded = self.ground.is_grounded();
        let contact_offset = self.config().contact_offset;
        let stable_angle = self.config().stable_angle_deg;
        let snap = self.config().use_ground_snap;

        let up = self.target.up();
        let reach = contact_offset * GROUND_PROBE_SCALE;
        let tangential_step = project_on_plane(&(self.velocity * dt), &up).norm();
        let expansion = tangential_step
            * stable_angle
                .min(MAX_PROBE_EXPANSION_DEG)
                .to_radians()
                .tan()
                .max(0.0);

        let Some(hit) = self.closest_hit(backend, &self.target, -up, reach + expansion, None) else {
            self.ground.clear();
            return;
        };

        let angle = angle_deg(&up, &hit.normal);
        let mut is_stable = false;
        if angle < stable_angle {
            let vertical_speed = self.velocity.dot(&up);
            let tolerance = if vertical_speed > 0.0 {
                vertical_speed * dt
            } else {
                tangential_step * angle.to_radians().tan()
            };
            is_stable = hit.distance <= reach + tolerance;
        }

        self.ground = GroundReport {
            hit_any_ground: true,
            is_stable,
            collider: Some(hit.collider),
            point: hit.point,
            normal: hit.normal,
            angle_deg: angle,
        };
        trace!(
            "character {:?}: ground {:?} at {:.4}, {:.1} deg, stable {is_stable}",
            self.body(),
            hit.collider,
            hit.distance,
            angle
        );

        if !is_stable {
            return;
        }

        if snap {
            self.target.translation -= up * (hit.distance - contact_offset);
        }
        if !was_grounded {
            self.land(&up, events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        character::{CharacterConfig, CharacterId},
        collision::{AnalyticScene, CollisionLayers, Transform, Vec3},
    };

    const DT: f32 = 0.02;

    fn character_above(
        scene: &mut AnalyticScene,
        normal: Vec3,
        gap: f32,
    ) -> CharacterController {
        let config = CharacterConfig::default();
        let feet = Vec3::zeros();
        let body_pose = config.body_pose(&Transform::from_translation(feet));
        let capsule = config.capsule();
        let (_, lowest) = capsule.segment(&body_pose);

        // Plane through the point `gap` below the capsule surface along the normal.
        let n = normal.normalize();
        let point = lowest - n * (capsule.radius + gap);
        scene.insert_half_space(point, n, CollisionLayers::all());

        let body = scene.insert_body(body_pose, CollisionLayers::all());
        CharacterController::new(body, config, Transform::from_translation(feet))
            .expect("valid config")
    }

    fn tilted(angle_deg: f32) -> Vec3 {
        let a = angle_deg.to_radians();
        Vec3::new(a.sin(), a.cos(), 0.0)
    }

    #[test]
    fn flat_ground_within_reach_is_stable_and_lands() {
        let mut scene = AnalyticScene::new();
        let mut c = character_above(&mut scene, Vec3::y(), 0.02);
        let mut events = Vec::new();

        c.detect_ground(DT, &scene, &mut events);
        assert!(c.ground().is_grounded());
        assert_eq!(events, vec![CharacterEvent::Landed(CharacterId(c.body()))]);

        // Already grounded: no second landing.
        events.clear();
        c.detect_ground(DT, &scene, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn gentle_slope_is_stable_and_steep_slope_is_not() {
        let co = CharacterConfig::default().contact_offset;

        let mut scene = AnalyticScene::new();
        let mut gentle = character_above(&mut scene, tilted(30.0), 0.5 * co);
        gentle.detect_ground(DT, &scene, &mut Vec::new());
        assert!(gentle.ground().hit_any_ground);
        assert!(gentle.ground().is_stable);
        assert!((gentle.ground().angle_deg - 30.0).abs() < 1.0e-2);

        let mut scene = AnalyticScene::new();
        let mut steep = character_above(&mut scene, tilted(60.0), 0.5 * co);
        steep.detect_ground(DT, &scene, &mut Vec::new());
        assert!(steep.ground().hit_any_ground);
        assert!(!steep.ground().is_stable);
        assert!(!steep.is_grounded());
    }

    #[test]
    fn snaps_down_to_contact_offset() {
        let mut scene = AnalyticScene::new();
        let mut c = character_above(&mut scene, Vec3::y(), 0.025);
        c.detect_ground(DT, &scene, &mut Vec::new());
        assert!(c.is_grounded());
        assert!((c.target.translation.y + 0.005).abs() < 1.0e-5);
    }

    #[test]
    fn ground_out_of_reach_is_not_reported() {
        let mut scene = AnalyticScene::new();
        let mut c = character_above(&mut scene, Vec3::y(), 0.5);
        c.detect_ground(DT, &scene, &mut Vec::new());
        assert!(!c.ground().hit_any_ground);
        assert!(c.ground().collider.is_none());
    }

    #[test]
    fn forced_unground_skips_the_probe_until_it_expires() {
        let mut scene = AnalyticScene::new();
        let mut c = character_above(&mut scene, Vec3::y(), 0.02);
        c.force_unground(0.05);

        let mut events = Vec::new();
        c.detect_ground(DT, &scene, &mut events);
        c.detect_ground(DT, &scene, &mut events);
        assert!(!c.ground().hit_any_ground);

        // Third call reaches 0.06 s, clearing the window without probing.
        c.detect_ground(DT, &scene, &mut events);
        assert!(!c.ground().hit_any_ground);
        assert!(events.is_empty());

        c.detect_ground(DT, &scene, &mut events);
        assert!(c.is_grounded());
        assert_eq!(events.len(), 1);
    }
}
