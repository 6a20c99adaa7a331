use thiserror::Error;

use crate::collision::ColliderId;

/// Invalid character or platform configuration, reported when the value is validated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("`{field}` must be finite and greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f32 },

    #[error("`{field}` must be finite and not negative (got {value})")]
    Negative { field: &'static str, value: f32 },

    #[error("`{field}` must be finite")]
    NotFinite { field: &'static str },

    #[error("capsule height {height} is shorter than its diameter {diameter}")]
    CapsuleTooShort { height: f32, diameter: f32 },

    #[error("`{field}` must allow at least one iteration")]
    NoIterations { field: &'static str },

    #[error("max jump distance {max} is below min jump distance {min}")]
    JumpRange { max: f32, min: f32 },

    #[error("rotation axis is zero while angular speed is {speed}")]
    ZeroRotationAxis { speed: f32 },
}

/// Registration failures of the tick orchestrator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("body collider {0:?} is not present in the collision backend")]
    MissingCollider(ColliderId),
}
