use crate::{
    character::config::Rate,
    collision::Vec3,
    utils::{clamp_magnitude, from_to_rotation, project_on_plane},
};

// NOTE: Pure velocity math. Nothing here touches collision; the controller feeds the result to
// the sweep-and-slide mover.

/// Move `current` toward `max_speed * direction` at `rate`.
///
/// - `Rate::Instant` snaps to the target in one step.
/// - Otherwise the velocity grows by `rate * dt` along `direction`, capped at `max_speed`.
#[inline]
pub fn accelerate(current: Vec3, direction: Vec3, max_speed: f32, rate: Rate, dt: f32) -> Vec3 {
    match rate {
        Rate::Instant => direction * max_speed,
        Rate::PerSecond(a) => clamp_magnitude(current + direction * (a * dt), max_speed),
    }
}

/// Exponential decay toward zero: `v * exp(-rate * dt)`. `Rate::Instant` stops at once.
#[inline]
pub fn decay(velocity: Vec3, rate: Rate, dt: f32) -> Vec3 {
    match rate {
        Rate::Instant => Vec3::zeros(),
        Rate::PerSecond(_) if dt <= 0.0 => velocity,
        Rate::PerSecond(r) => velocity * (-r * dt).exp(),
    }
}

/// Inputs for one tick of grounded velocity integration.
#[derive(Clone, Copy, Debug)]
pub struct GroundStep {
    pub velocity: Vec3,
    /// Raw requested direction in world space (expected on the horizontal plane).
    pub input: Vec3,
    /// Character up axis.
    pub up: Vec3,
    /// Normal of the stable ground under the character.
    pub ground_normal: Vec3,
    pub max_speed: f32,
    pub acceleration: Rate,
    pub friction: Rate,
    pub dt: f32,
}

/// Grounded velocity: keep the current speed but lay it along the slope, then accelerate toward
/// the input (rotated onto the slope) or decay by friction when there is no input.
pub fn ground_velocity(step: GroundStep) -> Vec3 {
    let GroundStep {
        velocity,
        input,
        up,
        ground_normal,
        max_speed,
        acceleration,
        friction,
        dt,
    } = step;

    let tilt = from_to_rotation(&up, &ground_normal);
    let speed = velocity.norm();
    let along_slope = project_on_plane(&velocity, &ground_normal)
        .try_normalize(f32::EPSILON)
        .map(|dir| dir * speed)
        .unwrap_or_else(Vec3::zeros);

    if input.norm_squared() > 0.0 {
        let direction = tilt * input;
        accelerate(along_slope, direction, max_speed, acceleration, dt)
    } else {
        decay(along_slope, friction, dt)
    }
}

/// Inputs for one tick of airborne velocity integration.
#[derive(Clone, Copy, Debug)]
pub struct AirStep {
    pub velocity: Vec3,
    pub input: Vec3,
    pub up: Vec3,
    pub max_air_speed: f32,
    pub air_acceleration: Rate,
    pub drag: Rate,
    /// Gravity actually applied this tick (zero when gravity is disabled).
    pub gravity: f32,
    /// Multiplier on `gravity`: 1 while rising, the fall or stop-jump weight otherwise.
    pub gravity_weight: f32,
    pub max_fall_speed: f32,
    pub dt: f32,
}

/// Airborne velocity split into its horizontal part and the signed speed along `up`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AirVelocity {
    pub horizontal: Vec3,
    pub vertical_speed: f32,
}

impl AirVelocity {
    #[inline]
    pub fn combined(&self, up: &Vec3) -> Vec3 {
        self.horizontal + up * self.vertical_speed
    }
}

/// Airborne velocity: horizontal control with air acceleration or drag, weighted gravity on the
/// vertical speed, clamped at the terminal fall speed.
pub fn air_velocity(step: AirStep) -> AirVelocity {
    let AirStep {
        velocity,
        input,
        up,
        max_air_speed,
        air_acceleration,
        drag,
        gravity,
        gravity_weight,
        max_fall_speed,
        dt,
    } = step;

    let vertical_speed = velocity.dot(&up);
    let horizontal = velocity - up * vertical_speed;
    let input = project_on_plane(&input, &up);

    let horizontal = if input.norm_squared() > 0.0 {
        accelerate(horizontal, input, max_air_speed, air_acceleration, dt)
    } else {
        decay(horizontal, drag, dt)
    };

    let vertical_speed = (vertical_speed - gravity * gravity_weight * dt).max(-max_fall_speed);

    AirVelocity {
        horizontal,
        vertical_speed,
    }
}

/// Launch speed that reaches `apex` meters under `gravity`.
#[inline]
pub fn jump_speed(gravity: f32, apex: f32) -> f32 {
    (2.0 * gravity * apex).max(0.0).sqrt()
}

/// Parameters of a variable-height jump.
#[derive(Clone, Copy, Debug)]
pub struct JumpProfile {
    pub gravity: f32,
    pub max_jump_distance: f32,
    pub min_jump_distance: f32,
}

impl JumpProfile {
    /// Height reached `elapsed` seconds into an uninterrupted jump.
    #[inline]
    pub fn height_at(&self, elapsed: f32) -> f32 {
        let v0 = jump_speed(self.gravity, self.max_jump_distance);
        v0 * elapsed - 0.5 * self.gravity * elapsed * elapsed
    }

    /// Gravity weight applied when the jump is released `elapsed` seconds after take-off.
    ///
    /// Scales with the height still to climb so an early release tops out near the min jump
    /// distance. Never below 1.
    pub fn stop_weight(&self, elapsed: f32) -> f32 {
        let remaining = self.max_jump_distance - self.height_at(elapsed).floor();
        (remaining / self.min_jump_distance).max(1.0)
    }
}
