use serde::{Deserialize, Serialize};

use crate::collision::{ColliderId, Vec3};

/// Locomotion mode. Only `Walk` integrates velocity; the others leave it untouched so a caller
/// can drive it through [`CharacterController::set_velocity`](super::CharacterController::set_velocity).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementState {
    #[default]
    Walk,
    Fly,
    Swim,
    Custom,
}

/// Result of the most recent ground probe.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroundReport {
    /// The probe touched something.
    pub hit_any_ground: bool,
    /// The touched surface is flat enough and close enough to stand on.
    pub is_stable: bool,
    pub collider: Option<ColliderId>,
    pub point: Vec3,
    pub normal: Vec3,
    /// Angle between the character up axis and `normal`, in degrees.
    pub angle_deg: f32,
}

impl GroundReport {
    /// Standing on stable ground.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.hit_any_ground && self.is_stable
    }

    /// Forget the last contact; nothing under the feet.
    #[inline]
    pub(crate) fn clear(&mut self) {
        self.hit_any_ground = false;
        self.is_stable = false;
        self.collider = None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TeleportRequest {
    pub position: Vec3,
    pub kill_velocity: bool,
}

/// Commands received between ticks, consumed at fixed points inside the next tick.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PendingRequests {
    pub jump: bool,
    pub stop_jump: bool,
    pub teleport: Option<TeleportRequest>,
    pub look: Option<Vec3>,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct JumpState {
    pub air_jumps_left: u32,
    pub is_jumping: bool,
    /// Seconds since the current jump started.
    pub elapsed: f32,
}

/// Ground detection is suppressed until `elapsed` reaches `duration`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct UngroundTimer {
    pub duration: f32,
    pub elapsed: f32,
}
