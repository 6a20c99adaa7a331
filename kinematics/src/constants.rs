//! Default tuning for characters, platforms and the fixed-step driver.
//!
//! Distances are in meters, time in seconds, angles in degrees. Per-character values live in
//! [`CharacterConfig`](crate::character::CharacterConfig); these constants are its defaults.

/// Gap kept between a character capsule and everything it touches (meters).
/// Too large creates visible gaps; too small risks jitter on contact.
pub const DEFAULT_CONTACT_OFFSET: f32 = 0.02;

/// Depenetration passes per `solve_overlap` call.
pub const DEFAULT_DEPENETRATION_ITERATIONS: u32 = 2;

/// Sweep-and-slide iterations per `character_move` call.
/// Higher values help with tight corners at the cost of more queries.
pub const DEFAULT_VELOCITY_ITERATIONS: u32 = 5;

pub const DEFAULT_CAPSULE_RADIUS: f32 = 0.5;
pub const DEFAULT_CAPSULE_HEIGHT: f32 = 2.0;

/// Gravity magnitude in meters per second squared (positive value).
pub const DEFAULT_GRAVITY_MPS2: f32 = 10.0;

/// Gravity multiplier applied once the character starts descending.
pub const DEFAULT_FALL_WEIGHT: f32 = 1.2;

/// Terminal fall speed (positive magnitude, m/s).
pub const DEFAULT_MAX_FALL_SPEED_MPS: f32 = 10.0;

/// Steepest surface a character can stand on.
pub const DEFAULT_STABLE_ANGLE_DEG: f32 = 50.0;

/// Default walking speed in meters per second.
pub const DEFAULT_MAX_SPEED_MPS: f32 = 5.0;
pub const DEFAULT_MAX_AIR_SPEED_MPS: f32 = 5.0;
pub const DEFAULT_AIR_ACCELERATION: f32 = 10.0;

/// Apex height of an uninterrupted jump (meters).
pub const DEFAULT_MAX_JUMP_DISTANCE: f32 = 5.0;
/// Apex height of a jump released immediately (meters).
pub const DEFAULT_MIN_JUMP_DISTANCE: f32 = 1.0;
pub const DEFAULT_EXTRA_AIR_JUMPS: u32 = 1;

/// Ground detection is suppressed this long after a jump so the jump is not cancelled by the
/// ground it started from.
pub const DEFAULT_JUMP_UNGROUND_TIME_S: f32 = 0.1;

/// Default duration for an explicit `force_unground` request.
pub const DEFAULT_FORCE_UNGROUND_TIME_S: f32 = 0.1;

/// Squared length below which a move, input or direction is treated as zero (m^2).
pub const MIN_MOVE_SQ: f32 = 1.0e-10;

/// Sweep hits at or below this distance are treated as "starting overlapped" (meters).
pub const OVERLAP_DISTANCE_EPS: f32 = 1.0e-5;

/// Practical small length for normalisation guards.
pub const DIST_EPS: f32 = 1.0e-6;

/// Fixed simulation step used by the sandbox and `FixedStepper::default` (seconds).
pub const DEFAULT_FIXED_DT_S: f32 = 0.02;

/// Upper bound on fixed steps run for a single frame, to avoid catch-up spirals after a stall.
pub const MAX_STEPS_PER_FRAME: u32 = 8;
