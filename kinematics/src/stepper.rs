use log::debug;

use crate::constants::{DEFAULT_FIXED_DT_S, MAX_STEPS_PER_FRAME};

/// Turns variable frame times into a whole number of fixed simulation steps.
///
/// Leftover time carries over to the next frame. After a long stall at most `max_steps` run and
/// the backlog beyond that is dropped instead of spiralling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedStepper {
    dt: f32,
    max_steps: u32,
    accumulator: f32,
}

impl Default for FixedStepper {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_DT_S, MAX_STEPS_PER_FRAME)
    }
}

impl FixedStepper {
    /// A non-finite or non-positive `dt` falls back to the default step.
    pub fn new(dt: f32, max_steps: u32) -> Self {
        let dt = if dt.is_finite() && dt > 0.0 {
            dt
        } else {
            DEFAULT_FIXED_DT_S
        };
        Self {
            dt,
            max_steps: max_steps.max(1),
            accumulator: 0.0,
        }
    }

    #[inline]
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Time banked toward the next step.
    #[inline]
    pub fn pending(&self) -> f32 {
        self.accumulator
    }

    /// Bank `frame_time` seconds and return how many fixed steps to run now.
    pub fn accumulate(&mut self, frame_time: f32) -> u32 {
        if frame_time.is_finite() && frame_time > 0.0 {
            self.accumulator += frame_time;
        }

        let mut steps = 0;
        while self.accumulator >= self.dt && steps < self.max_steps {
            self.accumulator -= self.dt;
            steps += 1;
        }

        if self.accumulator >= self.dt {
            debug!(
                "dropping {:.3}s of simulation backlog after {steps} steps",
                self.accumulator
            );
            self.accumulator %= self.dt;
        }
        steps
    }
}
