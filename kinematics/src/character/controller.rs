use log::{debug, trace, warn};

use super::{
    CharacterId,
    config::CharacterConfig,
    state::{GroundReport, JumpState, MovementState, PendingRequests, TeleportRequest, UngroundTimer},
};
use crate::{
    collision::{CapsuleSpec, ColliderId, CollisionBackend, QueryFilter, Transform, Vec3},
    error::ConfigError,
    events::CharacterEvent,
    motion::{self, AirStep, GroundStep, JumpProfile},
    platform::PlatformController,
    utils::{is_finite, look_rotation, wrap_degrees},
};

/// Kinematic capsule character: owns its velocity, ground state and pending commands, and moves
/// its body collider through a [`CollisionBackend`] during the two solver phases of a tick.
///
/// The character root is at the feet; the capsule centre sits `height / 2 + contact_offset`
/// above it along the character's up axis.
#[derive(Clone, Debug)]
pub struct CharacterController {
    body: ColliderId,
    config: CharacterConfig,
    capsule: CapsuleSpec,
    state: MovementState,

    /// Live root pose; equal to `target` outside of a tick.
    pose: Transform,
    /// Pose at the start of the current tick.
    pub(crate) snapshot: Transform,
    /// Pose being built by the current tick.
    pub(crate) target: Transform,

    pub(crate) velocity: Vec3,
    pub(crate) gravity_weight: f32,
    pub(crate) falling: bool,
    pub(crate) ground: GroundReport,
    pub(crate) jump: JumpState,
    pub(crate) unground: Option<UngroundTimer>,

    input_direction: Vec3,
    requests: PendingRequests,
}

impl CharacterController {
    /// Character whose body collider is `body`, standing with its feet at `pose`.
    ///
    /// The configuration is validated and normalized here; a bad value is rejected up front.
    pub fn new(
        body: ColliderId,
        config: CharacterConfig,
        pose: Transform,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let config = config.normalized();

        Ok(Self {
            body,
            capsule: config.capsule(),
            state: MovementState::Walk,
            pose,
            snapshot: pose,
            target: pose,
            velocity: Vec3::zeros(),
            gravity_weight: 1.0,
            falling: false,
            ground: GroundReport::default(),
            jump: JumpState {
                air_jumps_left: config.extra_air_jumps,
                ..JumpState::default()
            },
            unground: None,
            input_direction: Vec3::zeros(),
            requests: PendingRequests::default(),
            config,
        })
    }

    // --- accessors ---

    #[inline]
    pub fn id(&self) -> CharacterId {
        CharacterId(self.body)
    }

    #[inline]
    pub fn body(&self) -> ColliderId {
        self.body
    }

    #[inline]
    pub fn config(&self) -> &CharacterConfig {
        &self.config
    }

    #[inline]
    pub fn capsule(&self) -> CapsuleSpec {
        self.capsule
    }

    /// Root (feet) pose.
    #[inline]
    pub fn pose(&self) -> Transform {
        self.pose
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.pose.translation
    }

    /// Root pose at the start of the last tick.
    #[inline]
    pub fn snapshot(&self) -> Transform {
        self.snapshot
    }

    /// Root pose the last tick produced.
    #[inline]
    pub fn target(&self) -> Transform {
        self.target
    }

    /// Facing around the up axis in degrees, `[0, 360)`, zero along +Z.
    pub fn heading_deg(&self) -> f32 {
        let forward = self.pose.rotation * Vec3::z();
        wrap_degrees(forward.x.atan2(forward.z).to_degrees())
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    #[inline]
    pub fn movement_state(&self) -> MovementState {
        self.state
    }

    #[inline]
    pub fn ground(&self) -> &GroundReport {
        &self.ground
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.ground.is_grounded()
    }

    #[inline]
    pub fn is_jumping(&self) -> bool {
        self.jump.is_jumping
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        self.falling
    }

    #[inline]
    pub fn air_jumps_left(&self) -> u32 {
        self.jump.air_jumps_left
    }

    #[inline]
    pub fn gravity_weight(&self) -> f32 {
        self.gravity_weight
    }

    #[inline]
    pub fn input_direction(&self) -> Vec3 {
        self.input_direction
    }

    /// Pose of the capsule centre for a character whose feet are at `root`.
    #[inline]
    pub fn body_pose(&self, root: &Transform) -> Transform {
        self.config.body_pose(root)
    }

    #[inline]
    pub(crate) fn filter(&self) -> QueryFilter {
        QueryFilter::new(self.config.collision_mask, Some(self.body))
    }

    // --- commands ---

    /// Desired move direction in world space. Persists until replaced.
    ///
    /// Non-finite directions are replaced by zero.
    pub fn input_move(&mut self, direction: Vec3) {
        if is_finite(&direction) {
            self.input_direction = direction;
        } else {
            warn!(
                "character {:?}: ignoring non-finite move input {direction:?}",
                self.body
            );
            self.input_direction = Vec3::zeros();
        }
    }

    /// Request a jump on the next tick.
    pub fn input_jump(&mut self) {
        self.requests.jump = true;
    }

    /// Request that the current jump be cut short on the next tick.
    pub fn input_stop_jump(&mut self) {
        self.requests.stop_jump = true;
    }

    /// Move the feet to `position` at the start of the next tick, optionally zeroing velocity.
    pub fn teleport(&mut self, position: Vec3, kill_velocity: bool) {
        if !is_finite(&position) {
            warn!(
                "character {:?}: ignoring non-finite teleport target {position:?}",
                self.body
            );
            return;
        }
        self.requests.teleport = Some(TeleportRequest {
            position,
            kill_velocity,
        });
    }

    /// Face `direction` at the start of the next tick.
    pub fn look(&mut self, direction: Vec3) {
        self.requests.look = Some(direction);
    }

    /// Skip ground detection for `duration` seconds, starting with the next tick, so the
    /// character cannot be grounded.
    pub fn force_unground(&mut self, duration: f32) {
        let duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        self.unground = Some(UngroundTimer {
            duration,
            elapsed: 0.0,
        });
    }

    pub fn set_movement_state(&mut self, state: MovementState) {
        if self.state != state {
            debug!(
                "character {:?}: movement state {:?} -> {state:?}",
                self.body, self.state
            );
        }
        self.state = state;
    }

    /// Overwrite the velocity, e.g. to drive a non-walking state.
    pub fn set_velocity(&mut self, velocity: Vec3) {
        if is_finite(&velocity) {
            self.velocity = velocity;
        } else {
            warn!(
                "character {:?}: ignoring non-finite velocity {velocity:?}",
                self.body
            );
        }
    }

    // --- tick phases ---

    /// First solver phase: apply transform requests, resolve overlaps, probe the ground and ride
    /// whatever platform the character stands on.
    pub(crate) fn phase1<B: CollisionBackend>(
        &mut self,
        dt: f32,
        backend: &B,
        platforms: &[PlatformController],
        events: &mut Vec<CharacterEvent>,
    ) {
        self.snapshot = self.pose;
        self.target = self.pose;

        self.apply_transform_requests();
        self.solve_overlap(backend);

        if self.state == MovementState::Walk {
            self.detect_ground(dt, backend, events);
            self.follow_ground(dt, backend, platforms);
        }
    }

    /// Second solver phase: integrate velocity, process jumps, sweep the velocity move and
    /// publish the resulting pose so characters later in the order collide with it.
    pub(crate) fn phase2<B: CollisionBackend>(
        &mut self,
        dt: f32,
        backend: &mut B,
        events: &mut Vec<CharacterEvent>,
    ) {
        self.solve_overlap(&*backend);

        let jump = std::mem::take(&mut self.requests.jump);
        let stop_jump = std::mem::take(&mut self.requests.stop_jump);

        match self.state {
            MovementState::Walk => {
                self.integrate_walk(dt, events);
                self.update_jump(dt, jump, stop_jump);
            }
            other => {
                trace!(
                    "character {:?}: {other:?} keeps its velocity unchanged",
                    self.body
                );
            }
        }

        let displacement = self.velocity * dt;
        self.character_move(&*backend, displacement);

        self.pose = self.target;
        backend.teleport(self.body, self.body_pose(&self.target));
    }

    /// Publish the tick as a single authoritative transition from the snapshot to the target.
    pub(crate) fn commit<B: CollisionBackend>(&mut self, backend: &mut B) {
        backend.teleport(self.body, self.body_pose(&self.snapshot));
        backend.move_to(self.body, self.body_pose(&self.target));
        self.pose = self.target;
    }

    fn apply_transform_requests(&mut self) {
        if let Some(teleport) = self.requests.teleport.take() {
            debug!(
                "character {:?}: teleport to {:?}",
                self.body, teleport.position
            );
            self.target.translation = teleport.position;
            if teleport.kill_velocity {
                self.velocity = Vec3::zeros();
            }
        }

        if let Some(direction) = self.requests.look.take() {
            match look_rotation(&direction, &Vec3::y()) {
                Some(rotation) => self.target.rotation = rotation,
                None => debug!(
                    "character {:?}: dropping look toward degenerate direction {direction:?}",
                    self.body
                ),
            }
        }
    }

    /// Ride the platform under the character by the displacement of the contact point.
    ///
    /// The platform itself is skipped by the sweep; other geometry still blocks the ride.
    fn follow_ground<B: CollisionBackend>(
        &mut self,
        dt: f32,
        backend: &B,
        platforms: &[PlatformController],
    ) {
        if !self.ground.is_grounded() {
            return;
        }
        let Some(collider) = self.ground.collider else {
            return;
        };
        let Some(platform) = platforms.iter().find(|p| p.body() == collider) else {
            return;
        };

        let displacement = platform.point_displacement(&self.ground.point, dt);
        trace!(
            "character {:?}: riding platform {collider:?} by {displacement:?}",
            self.body
        );
        self.character_move_ignoring(backend, displacement, Some(collider));
    }

    fn integrate_walk(&mut self, dt: f32, events: &mut Vec<CharacterEvent>) {
        let up = self.target.up();

        if self.ground.is_grounded() {
            self.velocity = motion::ground_velocity(GroundStep {
                velocity: self.velocity,
                input: self.input_direction,
                up,
                ground_normal: self.ground.normal,
                max_speed: self.config.max_speed,
                acceleration: self.config.acceleration,
                friction: self.config.friction,
                dt,
            });
            return;
        }

        let air = motion::air_velocity(AirStep {
            velocity: self.velocity,
            input: self.input_direction,
            up,
            max_air_speed: self.config.max_air_speed,
            air_acceleration: self.config.air_acceleration,
            drag: self.config.drag,
            gravity: if self.config.use_gravity {
                self.config.gravity
            } else {
                0.0
            },
            gravity_weight: self.gravity_weight,
            max_fall_speed: self.config.max_fall_speed,
            dt,
        });
        self.velocity = air.combined(&up);

        if air.vertical_speed < 0.0 {
            self.jump.is_jumping = false;
            if !self.falling {
                self.falling = true;
                self.gravity_weight = self.config.fall_weight;
                debug!("character {:?}: began falling", self.body);
                events.push(CharacterEvent::BeganFalling(self.id()));
            }
        } else {
            self.falling = false;
        }
    }

    fn jump_profile(&self) -> JumpProfile {
        JumpProfile {
            gravity: self.config.gravity,
            max_jump_distance: self.config.max_jump_distance,
            min_jump_distance: self.config.min_jump_distance,
        }
    }

    fn update_jump(&mut self, dt: f32, jump: bool, stop_jump: bool) {
        if self.jump.is_jumping {
            self.jump.elapsed += dt;
        }

        if jump {
            let can_jump = if self.ground.is_grounded() {
                true
            } else if self.jump.air_jumps_left > 0 {
                self.jump.air_jumps_left -= 1;
                true
            } else {
                false
            };

            if can_jump {
                let up = self.target.up();
                let launch = motion::jump_speed(self.config.gravity, self.config.max_jump_distance);
                self.velocity = self.velocity - up * self.velocity.dot(&up) + up * launch;
                self.jump.is_jumping = true;
                self.jump.elapsed = 0.0;
                self.gravity_weight = 1.0;
                self.falling = false;
                self.force_unground(self.config.jump_unground_time);
                self.ground.clear();
                debug!(
                    "character {:?}: jump ({} air jumps left)",
                    self.body, self.jump.air_jumps_left
                );
            } else {
                debug!("character {:?}: jump refused, no air jumps left", self.body);
            }
        }

        if stop_jump && self.jump.is_jumping {
            self.gravity_weight = self.jump_profile().stop_weight(self.jump.elapsed);
            trace!(
                "character {:?}: jump released after {:.3}s, gravity weight {}",
                self.body, self.jump.elapsed, self.gravity_weight
            );
        }
    }

    /// Reset jump and gravity state on touchdown.
    pub(crate) fn land(&mut self, up: &Vec3, events: &mut Vec<CharacterEvent>) {
        self.velocity -= up * self.velocity.dot(up);
        self.jump.air_jumps_left = self.config.extra_air_jumps;
        self.jump.is_jumping = false;
        self.gravity_weight = 1.0;
        self.falling = false;
        debug!("character {:?}: landed", self.body);
        events.push(CharacterEvent::Landed(self.id()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{AnalyticScene, CollisionLayers};

    const DT: f32 = 0.02;

    fn floor_scene() -> (AnalyticScene, ColliderId) {
        let mut scene = AnalyticScene::new();
        scene.insert_half_space(Vec3::zeros(), Vec3::y(), CollisionLayers::all());
        let body = scene.insert_body(Transform::default(), CollisionLayers::all());
        (scene, body)
    }

    fn tick(character: &mut CharacterController, scene: &mut AnalyticScene) -> Vec<CharacterEvent> {
        let mut events = Vec::new();
        character.phase1(DT, &*scene, &[], &mut events);
        character.phase2(DT, scene, &mut events);
        character.commit(scene);
        events
    }

    #[test]
    fn rejects_invalid_config() {
        let config = CharacterConfig {
            radius: -1.0,
            ..CharacterConfig::default()
        };
        assert!(CharacterController::new(ColliderId(0), config, Transform::default()).is_err());
    }

    #[test]
    fn non_finite_move_input_becomes_zero() {
        let mut c =
            CharacterController::new(ColliderId(0), CharacterConfig::default(), Transform::default())
                .expect("valid config");
        c.input_move(Vec3::new(1.0, 0.0, 0.0));
        c.input_move(Vec3::new(f32::NAN, 0.0, 0.0));
        assert_eq!(c.input_direction(), Vec3::zeros());
    }

    #[test]
    fn walks_on_flat_ground_at_max_speed() {
        let (mut scene, body) = floor_scene();
        let mut c = CharacterController::new(body, CharacterConfig::default(), Transform::default())
            .expect("valid config");

        c.input_move(Vec3::x());
        tick(&mut c, &mut scene);
        assert!(c.is_grounded());
        assert!((c.velocity() - Vec3::new(5.0, 0.0, 0.0)).norm() < 1.0e-5);
        assert!((c.position().x - 0.1).abs() < 1.0e-5);
        assert!(c.position().y.abs() < 1.0e-5);
    }

    #[test]
    fn commit_leaves_the_body_at_the_target_with_the_snapshot_as_previous() {
        let (mut scene, body) = floor_scene();
        let start = Transform::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let mut c = CharacterController::new(body, CharacterConfig::default(), start)
            .expect("valid config");

        tick(&mut c, &mut scene);

        let current = scene.pose(body).expect("body exists");
        let previous = scene.previous_pose(body).expect("body exists");
        assert_eq!(current, c.body_pose(&c.pose()));
        assert_eq!(previous, c.body_pose(&start));
        assert!(c.position().y < 2.0);
    }

    #[test]
    fn fly_state_keeps_velocity() {
        let (mut scene, body) = floor_scene();
        let start = Transform::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let mut c = CharacterController::new(body, CharacterConfig::default(), start)
            .expect("valid config");
        c.set_movement_state(MovementState::Fly);
        c.set_velocity(Vec3::new(0.0, 0.0, 2.0));

        for _ in 0..10 {
            tick(&mut c, &mut scene);
        }
        assert_eq!(c.velocity(), Vec3::new(0.0, 0.0, 2.0));
        assert!((c.position() - Vec3::new(0.0, 5.0, 0.4)).norm() < 1.0e-4);
        assert!(!c.is_grounded());
    }

    #[test]
    fn teleport_and_look_apply_at_the_next_tick() {
        let (mut scene, body) = floor_scene();
        let mut c = CharacterController::new(body, CharacterConfig::default(), Transform::default())
            .expect("valid config");
        c.input_move(Vec3::new(0.0, 0.0, 0.0));
        c.set_velocity(Vec3::new(3.0, 0.0, 0.0));
        c.teleport(Vec3::new(10.0, 0.0, 0.0), true);
        c.look(Vec3::x());
        assert_eq!(c.position(), Vec3::zeros());

        tick(&mut c, &mut scene);
        assert!((c.position() - Vec3::new(10.0, 0.0, 0.0)).norm() < 1.0e-5);
        assert_eq!(c.velocity(), Vec3::zeros());
        assert!((c.pose().rotation * Vec3::z() - Vec3::x()).norm() < 1.0e-5);
        assert!((c.heading_deg() - 90.0).abs() < 1.0e-3);

        c.look(-Vec3::x());
        tick(&mut c, &mut scene);
        assert!((c.heading_deg() - 270.0).abs() < 1.0e-3);
    }

    #[test]
    fn degenerate_look_is_dropped() {
        let (mut scene, body) = floor_scene();
        let mut c = CharacterController::new(body, CharacterConfig::default(), Transform::default())
            .expect("valid config");
        c.look(Vec3::y());
        tick(&mut c, &mut scene);
        assert_eq!(c.pose().rotation, Transform::default().rotation);
    }
}
