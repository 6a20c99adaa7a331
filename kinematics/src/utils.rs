use nalgebra as na;

use crate::{
    collision::{Quat, Vec3},
    constants::{DIST_EPS, MIN_MOVE_SQ},
};

/// True when every component is finite.
#[inline]
pub fn is_finite(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// True for vectors that should not move anything: non-finite or practically zero.
#[inline]
pub fn is_negligible(v: &Vec3) -> bool {
    !is_finite(v) || v.norm_squared() <= MIN_MOVE_SQ
}

/// Unit vector along `v`, or `None` when `v` is too short (or non-finite) to have a direction.
#[inline]
pub fn safe_normalize(v: &Vec3) -> Option<Vec3> {
    if !is_finite(v) {
        return None;
    }
    v.try_normalize(DIST_EPS)
}

/// Remove the component of `v` along the plane normal `n`.
#[inline]
pub fn project_on_plane(v: &Vec3, n: &Vec3) -> Vec3 {
    let n_len_sq = n.norm_squared();
    if n_len_sq <= DIST_EPS * DIST_EPS {
        return *v;
    }
    v - n * (v.dot(n) / n_len_sq)
}

/// Unsigned angle between two vectors in degrees. Zero if either is degenerate.
#[inline]
pub fn angle_deg(a: &Vec3, b: &Vec3) -> f32 {
    let denom = (a.norm_squared() * b.norm_squared()).sqrt();
    if denom <= DIST_EPS {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Scale `v` down so its length does not exceed `max_len`.
#[inline]
pub fn clamp_magnitude(v: Vec3, max_len: f32) -> Vec3 {
    let len_sq = v.norm_squared();
    if len_sq > max_len * max_len && len_sq > 0.0 {
        v * (max_len / len_sq.sqrt())
    } else {
        v
    }
}

/// Shortest rotation taking direction `from` onto direction `to`.
///
/// Opposite vectors rotate half a turn about any axis perpendicular to `from`.
pub fn from_to_rotation(from: &Vec3, to: &Vec3) -> Quat {
    if let Some(rot) = Quat::rotation_between(from, to) {
        return rot;
    }

    let perpendicular = from
        .cross(&Vec3::x())
        .try_normalize(DIST_EPS)
        .or_else(|| from.cross(&Vec3::z()).try_normalize(DIST_EPS));
    match perpendicular {
        Some(axis) => Quat::from_axis_angle(&na::Unit::new_unchecked(axis), std::f32::consts::PI),
        None => Quat::identity(),
    }
}

/// Orientation whose local +Z faces `forward` with local +Y as close to `up` as possible.
///
/// `None` when `forward` is degenerate or parallel to `up`.
pub fn look_rotation(forward: &Vec3, up: &Vec3) -> Option<Quat> {
    let forward = safe_normalize(forward)?;
    if forward.cross(up).norm_squared() <= DIST_EPS {
        return None;
    }
    Some(Quat::face_towards(&forward, up))
}

/// Wrap an angle in degrees into `[0, 360)`.
#[inline]
pub fn wrap_degrees(deg: f32) -> f32 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}
