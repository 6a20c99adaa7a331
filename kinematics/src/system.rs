use log::{debug, info, warn};

use crate::{
    character::{CharacterController, CharacterId},
    collision::{CollisionBackend, Vec3},
    constants::DEFAULT_FORCE_UNGROUND_TIME_S,
    error::SystemError,
    events::CharacterEvent,
    platform::{PlatformController, PlatformId},
    stepper::FixedStepper,
};

/// Owns a collision backend plus every registered character and platform and advances them
/// together, one fixed step at a time.
///
/// Each [`tick`](Self::tick) runs in a strict order so coupled bodies never lag a step:
/// 1. platforms update their motion (scripts),
/// 2. characters run phase 1 against last step's platform poses,
/// 3. platforms move,
/// 4. characters run phase 2 against the moved platforms,
/// 5. characters, then platforms, commit their moves to the backend.
///
/// Within each stage bodies are visited in registration order.
pub struct KinematicSystem<B: CollisionBackend> {
    backend: B,
    characters: Vec<CharacterController>,
    platforms: Vec<PlatformController>,
    ticks: u64,
}

impl<B: CollisionBackend> KinematicSystem<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            characters: Vec::new(),
            platforms: Vec::new(),
            ticks: 0,
        }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable backend access between ticks, e.g. to add or remove static geometry.
    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Number of completed ticks.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // --- registration ---

    /// Add a character. Registering a body that is already registered is a no-op returning the
    /// existing handle.
    ///
    /// The body collider must already exist in the backend; it is placed at the character's pose.
    pub fn register_character(
        &mut self,
        character: CharacterController,
    ) -> Result<CharacterId, SystemError> {
        let id = character.id();
        if self.characters.iter().any(|c| c.id() == id) {
            debug!("character {id:?} already registered");
            return Ok(id);
        }
        if !self.backend.contains(character.body()) {
            return Err(SystemError::MissingCollider(character.body()));
        }
        character.config().validate()?;

        self.backend
            .teleport(character.body(), character.body_pose(&character.pose()));
        info!(
            "registered character {id:?} at {:?}",
            character.position()
        );
        self.characters.push(character);
        Ok(id)
    }

    /// Remove a character, handing it back. `None` when it was not registered.
    pub fn unregister_character(&mut self, id: CharacterId) -> Option<CharacterController> {
        let index = self.characters.iter().position(|c| c.id() == id)?;
        info!("unregistered character {id:?}");
        Some(self.characters.remove(index))
    }

    /// Add a platform. Registering a body that is already registered is a no-op returning the
    /// existing handle.
    pub fn register_platform(
        &mut self,
        platform: PlatformController,
    ) -> Result<PlatformId, SystemError> {
        let id = platform.id();
        if self.platforms.iter().any(|p| p.id() == id) {
            debug!("platform {id:?} already registered");
            return Ok(id);
        }
        if !self.backend.contains(platform.body()) {
            return Err(SystemError::MissingCollider(platform.body()));
        }
        platform.motion().validate()?;

        self.backend.teleport(platform.body(), platform.pose());
        info!("registered platform {id:?} at {:?}", platform.pose().translation);
        self.platforms.push(platform);
        Ok(id)
    }

    pub fn unregister_platform(&mut self, id: PlatformId) -> Option<PlatformController> {
        let index = self.platforms.iter().position(|p| p.id() == id)?;
        info!("unregistered platform {id:?}");
        Some(self.platforms.remove(index))
    }

    // --- lookup ---

    pub fn character(&self, id: CharacterId) -> Option<&CharacterController> {
        self.characters.iter().find(|c| c.id() == id)
    }

    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut CharacterController> {
        self.characters.iter_mut().find(|c| c.id() == id)
    }

    /// Characters in registration order.
    pub fn characters(&self) -> impl Iterator<Item = &CharacterController> {
        self.characters.iter()
    }

    pub fn platform(&self, id: PlatformId) -> Option<&PlatformController> {
        self.platforms.iter().find(|p| p.id() == id)
    }

    pub fn platform_mut(&mut self, id: PlatformId) -> Option<&mut PlatformController> {
        self.platforms.iter_mut().find(|p| p.id() == id)
    }

    /// Platforms in registration order.
    pub fn platforms(&self) -> impl Iterator<Item = &PlatformController> {
        self.platforms.iter()
    }

    // --- commands ---
    //
    // Each returns `false` when the character is not registered.

    pub fn input_move(&mut self, id: CharacterId, direction: Vec3) -> bool {
        self.with_character(id, |c| c.input_move(direction))
    }

    pub fn input_jump(&mut self, id: CharacterId) -> bool {
        self.with_character(id, CharacterController::input_jump)
    }

    pub fn input_stop_jump(&mut self, id: CharacterId) -> bool {
        self.with_character(id, CharacterController::input_stop_jump)
    }

    pub fn teleport(&mut self, id: CharacterId, position: Vec3, kill_velocity: bool) -> bool {
        self.with_character(id, |c| c.teleport(position, kill_velocity))
    }

    pub fn look(&mut self, id: CharacterId, direction: Vec3) -> bool {
        self.with_character(id, |c| c.look(direction))
    }

    /// Suppress ground detection for `duration` seconds (default duration when `None`).
    pub fn force_unground(&mut self, id: CharacterId, duration: Option<f32>) -> bool {
        let duration = duration.unwrap_or(DEFAULT_FORCE_UNGROUND_TIME_S);
        self.with_character(id, |c| c.force_unground(duration))
    }

    fn with_character(
        &mut self,
        id: CharacterId,
        f: impl FnOnce(&mut CharacterController),
    ) -> bool {
        match self.character_mut(id) {
            Some(character) => {
                f(character);
                true
            }
            None => {
                debug!("command for unknown character {id:?} ignored");
                false
            }
        }
    }

    // --- stepping ---

    /// Advance every registered body by one fixed step of `dt` seconds.
    ///
    /// A non-finite or non-positive `dt` does nothing.
    pub fn tick(&mut self, dt: f32) -> Vec<CharacterEvent> {
        let mut events = Vec::new();
        if !(dt.is_finite() && dt > 0.0) {
            warn!("ignoring tick with invalid dt {dt}");
            return events;
        }

        for platform in &mut self.platforms {
            platform.update_motion(dt);
        }

        for character in &mut self.characters {
            character.phase1(dt, &self.backend, &self.platforms, &mut events);
        }

        for platform in &mut self.platforms {
            platform.simulate(dt, &mut self.backend);
        }

        for character in &mut self.characters {
            character.phase2(dt, &mut self.backend, &mut events);
        }

        for character in &mut self.characters {
            character.commit(&mut self.backend);
        }
        for platform in &mut self.platforms {
            platform.commit(&mut self.backend);
        }

        self.ticks += 1;
        events
    }

    /// Run as many fixed steps as `stepper` releases for `frame_time` seconds of wall time.
    pub fn advance(&mut self, stepper: &mut FixedStepper, frame_time: f32) -> Vec<CharacterEvent> {
        let steps = stepper.accumulate(frame_time);
        let mut events = Vec::new();
        for _ in 0..steps {
            events.extend(self.tick(stepper.dt()));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        character::CharacterConfig,
        collision::{AnalyticScene, ColliderId, CollisionLayers, Transform},
        platform::PlatformMotion,
    };

    const DT: f32 = 0.02;

    fn scene_with_floor() -> AnalyticScene {
        let mut scene = AnalyticScene::new();
        scene.insert_half_space(Vec3::zeros(), Vec3::y(), CollisionLayers::all());
        scene
    }

    fn add_character(system: &mut KinematicSystem<AnalyticScene>, feet: Vec3) -> CharacterId {
        let pose = Transform::from_translation(feet);
        let body = system
            .backend_mut()
            .insert_body(Transform::default(), CollisionLayers::all());
        let character = CharacterController::new(body, CharacterConfig::default(), pose)
            .expect("valid config");
        system.register_character(character).expect("registered")
    }

    #[test]
    fn registration_is_idempotent_and_syncs_the_body() {
        let mut system = KinematicSystem::new(scene_with_floor());
        let id = add_character(&mut system, Vec3::new(1.0, 0.0, 0.0));

        let again = CharacterController::new(id.0, CharacterConfig::default(), Transform::default())
            .expect("valid config");
        assert_eq!(system.register_character(again), Ok(id));
        assert_eq!(system.characters().count(), 1);

        let body_pose = system.backend().pose(id.0).expect("body");
        assert!((body_pose.translation - Vec3::new(1.0, 1.02, 0.0)).norm() < 1.0e-6);

        assert!(system.unregister_character(id).is_some());
        assert!(system.unregister_character(id).is_none());
    }

    #[test]
    fn registration_requires_the_body_collider() {
        let mut system = KinematicSystem::new(scene_with_floor());
        let ghost = CharacterController::new(
            ColliderId(999),
            CharacterConfig::default(),
            Transform::default(),
        )
        .expect("valid config");
        assert_eq!(
            system.register_character(ghost).err(),
            Some(SystemError::MissingCollider(ColliderId(999)))
        );
    }

    #[test]
    fn invalid_dt_is_a_no_op() {
        let mut system = KinematicSystem::new(scene_with_floor());
        let id = add_character(&mut system, Vec3::new(0.0, 3.0, 0.0));

        for dt in [0.0, -DT, f32::NAN, f32::INFINITY] {
            assert!(system.tick(dt).is_empty());
        }
        assert_eq!(system.ticks(), 0);
        let c = system.character(id).expect("registered");
        assert_eq!(c.position(), Vec3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn falling_then_landing_reports_each_transition_once() {
        let mut system = KinematicSystem::new(scene_with_floor());
        let id = add_character(&mut system, Vec3::new(0.0, 0.5, 0.0));

        let mut events = Vec::new();
        for _ in 0..100 {
            events.extend(system.tick(DT));
        }
        assert_eq!(
            events,
            vec![CharacterEvent::BeganFalling(id), CharacterEvent::Landed(id)]
        );
        let c = system.character(id).expect("registered");
        assert!(c.is_grounded());
        assert!(c.position().y.abs() < 1.0e-4);
    }

    #[test]
    fn commands_for_unknown_characters_report_false() {
        let mut system = KinematicSystem::new(scene_with_floor());
        let ghost = CharacterId(ColliderId(42));
        assert!(!system.input_move(ghost, Vec3::x()));
        assert!(!system.input_jump(ghost));
        assert!(!system.force_unground(ghost, None));
    }

    #[test]
    fn platforms_move_and_commit_each_tick() {
        let mut system = KinematicSystem::new(AnalyticScene::new());
        let body = system
            .backend_mut()
            .insert_body(Transform::default(), CollisionLayers::all());
        let platform = PlatformController::new(
            body,
            PlatformMotion::linear(Vec3::new(1.0, 0.0, 0.0)),
            Transform::default(),
        )
        .expect("valid motion");
        let id = system.register_platform(platform).expect("registered");

        for _ in 0..10 {
            system.tick(DT);
        }
        let p = system.platform(id).expect("registered");
        assert!((p.pose().translation.x - 0.2).abs() < 1.0e-5);
        let previous = system.backend().previous_pose(body).expect("body");
        assert!((previous.translation.x - 0.18).abs() < 1.0e-5);
    }

    #[test]
    fn advance_runs_whole_steps() {
        let mut system = KinematicSystem::new(scene_with_floor());
        add_character(&mut system, Vec3::zeros());
        let mut stepper = FixedStepper::new(DT, 8);

        system.advance(&mut stepper, 0.05);
        assert_eq!(system.ticks(), 2);
        system.advance(&mut stepper, 0.011);
        assert_eq!(system.ticks(), 3);
    }
}
