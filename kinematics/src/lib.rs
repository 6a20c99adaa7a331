pub mod bitmask_flags;
pub mod character;
pub mod collision;
pub mod constants;
pub mod error;
pub mod events;
pub mod motion;
pub mod platform;
pub mod stepper;
pub mod system;
pub mod utils;

pub use character::{
    CharacterConfig, CharacterController, CharacterId, GroundReport, MovementState, Rate,
};
pub use collision::{
    AnalyticScene, ColliderId, ColliderShapeDef, CollisionBackend, CollisionLayers, Layer,
    Quat, RapierScene, Transform, Vec3, WorldStaticDef, layers_of,
};
pub use error::{ConfigError, SystemError};
pub use events::CharacterEvent;
pub use platform::{PlatformController, PlatformId, PlatformMotion, PlatformScript};
pub use stepper::FixedStepper;
pub use system::KinematicSystem;
