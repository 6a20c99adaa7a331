use std::fmt;

use log::{debug, trace};
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::{
    collision::{ColliderId, CollisionBackend, Quat, Transform, Vec3},
    error::ConfigError,
    utils::{is_finite, safe_normalize},
};

/// Handle of a platform registered with a [`KinematicSystem`](crate::system::KinematicSystem).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlatformId(pub ColliderId);

/// Constant-rate motion of a platform: world-space linear velocity plus a spin about an axis
/// expressed in the platform's local frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformMotion {
    /// Meters per second, world space.
    pub velocity: Vec3,
    /// Local rotation axis; need not be unit length.
    pub rotation_axis: Vec3,
    /// Radians per second about `rotation_axis`.
    pub angular_speed_radps: f32,
}

impl Default for PlatformMotion {
    fn default() -> Self {
        Self {
            velocity: Vec3::zeros(),
            rotation_axis: Vec3::y(),
            angular_speed_radps: 0.0,
        }
    }
}

impl PlatformMotion {
    pub fn linear(velocity: Vec3) -> Self {
        Self {
            velocity,
            ..Self::default()
        }
    }

    pub fn spinning(rotation_axis: Vec3, angular_speed_radps: f32) -> Self {
        Self {
            rotation_axis,
            angular_speed_radps,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_finite(&self.velocity) {
            return Err(ConfigError::NotFinite { field: "velocity" });
        }
        if !is_finite(&self.rotation_axis) {
            return Err(ConfigError::NotFinite {
                field: "rotation_axis",
            });
        }
        if !self.angular_speed_radps.is_finite() {
            return Err(ConfigError::NotFinite {
                field: "angular_speed_radps",
            });
        }
        if self.angular_speed_radps != 0.0 && safe_normalize(&self.rotation_axis).is_none() {
            return Err(ConfigError::ZeroRotationAxis {
                speed: self.angular_speed_radps,
            });
        }
        Ok(())
    }

    /// Rotation accumulated over `dt` about `axis` (already in the frame it should apply in).
    fn spin(axis: &Vec3, angle: f32) -> Quat {
        match safe_normalize(axis) {
            Some(axis) if angle != 0.0 => {
                Quat::from_axis_angle(&na::Unit::new_unchecked(axis), angle)
            }
            _ => Quat::identity(),
        }
    }
}

/// Hook run at the start of every tick to change a platform's motion, e.g. a back-and-forth
/// route or a scripted rotation.
pub trait PlatformScript: fmt::Debug {
    fn update_motion(&mut self, motion: &mut PlatformMotion, pose: &Transform, dt: f32);
}

/// Kinematic platform: moves its body collider by a constant velocity and spin each tick and
/// tells characters standing on it how far their contact point was carried.
#[derive(Debug)]
pub struct PlatformController {
    body: ColliderId,
    motion: PlatformMotion,
    script: Option<Box<dyn PlatformScript>>,
    pose: Transform,
    snapshot: Transform,
    target: Transform,
    last_displacement: (Vec3, Quat),
}

impl PlatformController {
    /// Platform whose body collider is `body`, currently at `pose`.
    pub fn new(
        body: ColliderId,
        motion: PlatformMotion,
        pose: Transform,
    ) -> Result<Self, ConfigError> {
        motion.validate()?;
        Ok(Self {
            body,
            motion,
            script: None,
            pose,
            snapshot: pose,
            target: pose,
            last_displacement: (Vec3::zeros(), Quat::identity()),
        })
    }

    pub fn with_script(mut self, script: impl PlatformScript + 'static) -> Self {
        self.script = Some(Box::new(script));
        self
    }

    #[inline]
    pub fn id(&self) -> PlatformId {
        PlatformId(self.body)
    }

    #[inline]
    pub fn body(&self) -> ColliderId {
        self.body
    }

    #[inline]
    pub fn pose(&self) -> Transform {
        self.pose
    }

    #[inline]
    pub fn motion(&self) -> &PlatformMotion {
        &self.motion
    }

    pub fn set_motion(&mut self, motion: PlatformMotion) -> Result<(), ConfigError> {
        motion.validate()?;
        self.motion = motion;
        Ok(())
    }

    /// Translation and rotation applied by the most recent tick.
    #[inline]
    pub fn last_displacement(&self) -> (Vec3, Quat) {
        self.last_displacement
    }

    /// How far a world-space point riding the platform is carried over `dt`: the linear step
    /// plus the rotation of the point about the platform origin.
    pub fn point_displacement(&self, point: &Vec3, dt: f32) -> Vec3 {
        let linear = self.motion.velocity * dt;
        if self.motion.angular_speed_radps == 0.0 {
            return linear;
        }

        let world_axis = self.pose.rotation * self.motion.rotation_axis;
        let spin = PlatformMotion::spin(&world_axis, self.motion.angular_speed_radps * dt);
        let offset = point - self.pose.translation;
        linear + (spin * offset - offset)
    }

    /// Let the attached script adjust the motion for this tick.
    pub(crate) fn update_motion(&mut self, dt: f32) {
        let Some(script) = self.script.as_mut() else {
            return;
        };
        let before = self.motion;
        script.update_motion(&mut self.motion, &self.pose, dt);

        if let Err(err) = self.motion.validate() {
            debug!(
                "platform {:?}: script produced invalid motion ({err}), keeping previous",
                self.body
            );
            self.motion = before;
        }
    }

    /// Advance the platform by one step and publish the pose so characters see it moved.
    pub(crate) fn simulate<B: CollisionBackend>(&mut self, dt: f32, backend: &mut B) {
        self.snapshot = self.pose;

        let linear = self.motion.velocity * dt;
        let angular = PlatformMotion::spin(
            &self.motion.rotation_axis,
            self.motion.angular_speed_radps * dt,
        );

        self.target = Transform::new(
            self.pose.translation + linear,
            self.pose.rotation * angular,
        );
        self.last_displacement = (linear, angular);
        self.pose = self.target;
        backend.teleport(self.body, self.target);

        trace!("platform {:?}: moved by {linear:?}", self.body);
    }

    /// Publish the tick as a single transition from the snapshot to the target.
    pub(crate) fn commit<B: CollisionBackend>(&mut self, backend: &mut B) {
        backend.teleport(self.body, self.snapshot);
        backend.move_to(self.body, self.target);
        self.pose = self.target;
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::collision::{AnalyticScene, CollisionLayers};

    #[test]
    fn rejects_spin_without_axis() {
        let motion = PlatformMotion::spinning(Vec3::zeros(), 1.0);
        assert_eq!(
            PlatformController::new(ColliderId(0), motion, Transform::default()).err(),
            Some(ConfigError::ZeroRotationAxis { speed: 1.0 })
        );
        // No spin, no axis needed.
        let still = PlatformMotion::spinning(Vec3::zeros(), 0.0);
        assert!(PlatformController::new(ColliderId(0), still, Transform::default()).is_ok());
    }

    #[test]
    fn linear_point_displacement() {
        let p = PlatformController::new(
            ColliderId(0),
            PlatformMotion::linear(Vec3::new(2.0, 0.0, 0.0)),
            Transform::default(),
        )
        .expect("valid motion");
        let d = p.point_displacement(&Vec3::new(5.0, 1.0, 0.0), 0.5);
        assert!((d - Vec3::new(1.0, 0.0, 0.0)).norm() < 1.0e-6);
    }

    #[test]
    fn spinning_point_displacement_rotates_about_the_origin() {
        let p = PlatformController::new(
            ColliderId(0),
            PlatformMotion::spinning(Vec3::y(), FRAC_PI_2),
            Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)),
        )
        .expect("valid motion");

        // A quarter turn about +Y carries (2, 0, 0) to (1, 0, -1).
        let d = p.point_displacement(&Vec3::new(2.0, 0.0, 0.0), 1.0);
        assert!((d - Vec3::new(-1.0, 0.0, -1.0)).norm() < 1.0e-5);
    }

    #[test]
    fn simulate_and_commit_move_the_body_once() {
        let mut scene = AnalyticScene::new();
        let body = scene.insert_body(Transform::default(), CollisionLayers::all());
        let mut p = PlatformController::new(
            body,
            PlatformMotion::linear(Vec3::new(0.0, 0.0, 3.0)),
            Transform::default(),
        )
        .expect("valid motion");

        p.simulate(0.1, &mut scene);
        p.commit(&mut scene);

        let expected = Vec3::new(0.0, 0.0, 0.3);
        assert!((p.pose().translation - expected).norm() < 1.0e-6);
        assert_eq!(scene.pose(body), Some(p.pose()));
        assert_eq!(scene.previous_pose(body), Some(Transform::default()));
        assert!((p.last_displacement().0 - expected).norm() < 1.0e-6);
    }

    #[derive(Debug)]
    struct Reverse;

    impl PlatformScript for Reverse {
        fn update_motion(&mut self, motion: &mut PlatformMotion, _pose: &Transform, _dt: f32) {
            motion.velocity = -motion.velocity;
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl PlatformScript for Broken {
        fn update_motion(&mut self, motion: &mut PlatformMotion, _pose: &Transform, _dt: f32) {
            motion.velocity.x = f32::NAN;
        }
    }

    #[test]
    fn scripts_update_motion_and_invalid_results_are_dropped() {
        let motion = PlatformMotion::linear(Vec3::x());
        let mut p = PlatformController::new(ColliderId(0), motion, Transform::default())
            .expect("valid motion")
            .with_script(Reverse);
        p.update_motion(0.02);
        assert_eq!(p.motion().velocity, -Vec3::x());

        let mut broken = PlatformController::new(ColliderId(1), motion, Transform::default())
            .expect("valid motion")
            .with_script(Broken);
        broken.update_motion(0.02);
        assert_eq!(broken.motion().velocity, Vec3::x());
    }
}
