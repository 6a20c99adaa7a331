use kinematics::{PlatformMotion, PlatformScript, Transform};

/// Reverses the platform's velocity and spin every `half_period` seconds, so it shuttles back
/// and forth along its route.
#[derive(Clone, Debug)]
pub struct PingPong {
    half_period: f32,
    elapsed: f32,
}

impl PingPong {
    pub fn new(half_period: f32) -> Self {
        Self {
            half_period: half_period.max(f32::EPSILON),
            elapsed: 0.0,
        }
    }
}

impl PlatformScript for PingPong {
    fn update_motion(&mut self, motion: &mut PlatformMotion, _pose: &Transform, dt: f32) {
        self.elapsed += dt;
        if self.elapsed >= self.half_period {
            self.elapsed -= self.half_period;
            motion.velocity = -motion.velocity;
            motion.angular_speed_radps = -motion.angular_speed_radps;
        }
    }
}
