/*!
Kinematic capsule characters.

- config:     serializable per-character tuning and its validation
- state:      movement state, ground report and per-tick bookkeeping
- controller: the character itself, its commands and the solver phases
- kinematic:  sweep-and-slide, depenetration and the closest-hit query
- ground:     ground probe, stability classification, snapping and landing
*/

pub mod config;
mod controller;
mod ground;
mod kinematic;
pub mod state;

use serde::{Deserialize, Serialize};

use crate::collision::ColliderId;

pub use config::{CharacterConfig, Rate};
pub use controller::CharacterController;
pub use state::{GroundReport, MovementState};

/// Handle of a character registered with a [`KinematicSystem`](crate::system::KinematicSystem).
///
/// A character is keyed by its body collider, which is unique per backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub ColliderId);
