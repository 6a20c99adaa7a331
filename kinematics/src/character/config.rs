use serde::{Deserialize, Serialize};

use crate::{
    collision::{CapsuleSpec, CollisionLayers, Transform, Vec3},
    constants::*,
    error::ConfigError,
};

/// How quickly a velocity approaches its target.
///
/// `Instant` reaches the target in a single step; `PerSecond(r)` uses `r` as an acceleration
/// (m/s²) or an exponential decay rate (1/s) depending on where it is used.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rate {
    Instant,
    PerSecond(f32),
}

impl Rate {
    #[inline]
    pub fn is_instant(&self) -> bool {
        matches!(self, Rate::Instant)
    }

    /// Rate as a number; `Instant` is positive infinity.
    #[inline]
    pub fn value(&self) -> f32 {
        match *self {
            Rate::Instant => f32::INFINITY,
            Rate::PerSecond(r) => r,
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        match *self {
            Rate::Instant => Ok(()),
            Rate::PerSecond(r) => non_negative(field, r),
        }
    }
}

/// Per-character tuning. Plain data: build one, validate it, hand it to a controller.
///
/// Missing fields in serialized form fall back to [`CharacterConfig::default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    // Shape
    pub radius: f32,
    /// Full capsule height including both caps.
    pub height: f32,
    /// Gap kept between the capsule and everything it touches.
    pub contact_offset: f32,
    pub collision_mask: CollisionLayers,

    // Solver budgets
    pub depenetration_iterations: u32,
    pub velocity_iterations: u32,
    /// When the slide budget runs out, drop everything the move achieved and return to where
    /// that `character_move` call started, not to the tick snapshot.
    pub discard_position_on_exhaustion: bool,
    /// When the slide budget runs out, drop the distance that was not delivered.
    pub discard_remainder_on_exhaustion: bool,

    // Gravity
    pub use_gravity: bool,
    pub gravity: f32,
    pub fall_weight: f32,
    pub max_fall_speed: f32,

    // Grounding
    pub use_ground_snap: bool,
    pub stable_angle_deg: f32,

    // Walk
    pub max_speed: f32,
    pub acceleration: Rate,
    pub friction: Rate,

    // Air
    pub max_air_speed: f32,
    pub air_acceleration: Rate,
    pub drag: Rate,

    // Jump
    pub max_jump_distance: f32,
    pub min_jump_distance: f32,
    pub extra_air_jumps: u32,
    pub jump_unground_time: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_CAPSULE_RADIUS,
            height: DEFAULT_CAPSULE_HEIGHT,
            contact_offset: DEFAULT_CONTACT_OFFSET,
            collision_mask: CollisionLayers::all(),
            depenetration_iterations: DEFAULT_DEPENETRATION_ITERATIONS,
            velocity_iterations: DEFAULT_VELOCITY_ITERATIONS,
            discard_position_on_exhaustion: true,
            discard_remainder_on_exhaustion: true,
            use_gravity: true,
            gravity: DEFAULT_GRAVITY_MPS2,
            fall_weight: DEFAULT_FALL_WEIGHT,
            max_fall_speed: DEFAULT_MAX_FALL_SPEED_MPS,
            use_ground_snap: true,
            stable_angle_deg: DEFAULT_STABLE_ANGLE_DEG,
            max_speed: DEFAULT_MAX_SPEED_MPS,
            acceleration: Rate::Instant,
            friction: Rate::Instant,
            max_air_speed: DEFAULT_MAX_AIR_SPEED_MPS,
            air_acceleration: Rate::PerSecond(DEFAULT_AIR_ACCELERATION),
            drag: Rate::Instant,
            max_jump_distance: DEFAULT_MAX_JUMP_DISTANCE,
            min_jump_distance: DEFAULT_MIN_JUMP_DISTANCE,
            extra_air_jumps: DEFAULT_EXTRA_AIR_JUMPS,
            jump_unground_time: DEFAULT_JUMP_UNGROUND_TIME_S,
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

impl CharacterConfig {
    /// Check every field; the first problem found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("radius", self.radius)?;
        positive("height", self.height)?;
        if self.height < 2.0 * self.radius {
            return Err(ConfigError::CapsuleTooShort {
                height: self.height,
                diameter: 2.0 * self.radius,
            });
        }
        non_negative("contact_offset", self.contact_offset)?;

        if self.velocity_iterations == 0 {
            return Err(ConfigError::NoIterations {
                field: "velocity_iterations",
            });
        }

        non_negative("gravity", self.gravity)?;
        positive("fall_weight", self.fall_weight)?;
        non_negative("max_fall_speed", self.max_fall_speed)?;

        if !self.stable_angle_deg.is_finite() {
            return Err(ConfigError::NotFinite {
                field: "stable_angle_deg",
            });
        }

        non_negative("max_speed", self.max_speed)?;
        self.acceleration.validate("acceleration")?;
        self.friction.validate("friction")?;
        non_negative("max_air_speed", self.max_air_speed)?;
        self.air_acceleration.validate("air_acceleration")?;
        self.drag.validate("drag")?;

        positive("min_jump_distance", self.min_jump_distance)?;
        positive("max_jump_distance", self.max_jump_distance)?;
        if self.max_jump_distance < self.min_jump_distance {
            return Err(ConfigError::JumpRange {
                max: self.max_jump_distance,
                min: self.min_jump_distance,
            });
        }
        non_negative("jump_unground_time", self.jump_unground_time)?;

        Ok(())
    }

    /// Copy with derived limits pulled into range (stability angle in `[0, 90]`).
    pub fn normalized(&self) -> Self {
        Self {
            stable_angle_deg: self.stable_angle_deg.clamp(0.0, 90.0),
            ..self.clone()
        }
    }

    /// Parry capsule for this character.
    #[inline]
    pub fn capsule(&self) -> CapsuleSpec {
        CapsuleSpec {
            radius: self.radius,
            half_height: (0.5 * self.height - self.radius).max(0.0),
        }
    }

    /// Height of the capsule centre above the character root (the feet).
    #[inline]
    pub fn body_offset(&self) -> f32 {
        0.5 * self.height + self.contact_offset
    }

    /// Pose of the capsule centre for a character whose feet are at `root`.
    #[inline]
    pub fn body_pose(&self, root: &Transform) -> Transform {
        Transform::new(
            root.translation + root.rotation * Vec3::new(0.0, self.body_offset(), 0.0),
            root.rotation,
        )
    }
}
