//! Deterministic closed-form collision scene made of half-spaces.
//!
//! Every query is solved exactly (capsule vs. plane has a closed form), so solver tests can
//! assert precise distances without depending on a narrow-phase implementation. Capsule bodies
//! can be registered so characters have a pose to read and write, but they are not collidable
//! in this scene.

use std::collections::BTreeMap;

use super::{
    backend::CollisionBackend,
    types::{
        CapsuleSpec, ColliderId, CollisionLayers, Penetration, QueryFilter, SweepHit, Transform,
        Vec3,
    },
};

/// Approach speeds below this never reach a plane.
const MIN_CLOSING: f32 = 1.0e-6;

#[derive(Clone, Copy, Debug)]
enum AnalyticShape {
    /// Solid below the plane through the pose origin with normal `pose.rotation * normal`.
    HalfSpace { normal: Vec3 },
    /// Pose bookkeeping only.
    Body,
}

#[derive(Clone, Copy, Debug)]
struct AnalyticEntry {
    shape: AnalyticShape,
    pose: Transform,
    previous: Transform,
    layers: CollisionLayers,
    sensor: bool,
}

impl AnalyticEntry {
    /// World-space unit normal and a point on the plane.
    fn plane(&self) -> Option<(Vec3, Vec3)> {
        match self.shape {
            AnalyticShape::HalfSpace { normal } => {
                Some((self.pose.rotation * normal, self.pose.translation))
            }
            AnalyticShape::Body => None,
        }
    }
}

#[derive(Default)]
pub struct AnalyticScene {
    entries: BTreeMap<ColliderId, AnalyticEntry>,
    next_id: u32,
}

/// Signed gap between a capsule surface and a plane, plus the cap centre nearest the plane.
fn capsule_plane_gap(pose: &Transform, capsule: &CapsuleSpec, n: Vec3, p: Vec3) -> (f32, Vec3) {
    let (a, b) = capsule.segment(pose);
    let da = n.dot(&(a - p));
    let db = n.dot(&(b - p));

    let nearest = if (da - db).abs() <= f32::EPSILON {
        pose.translation
    } else if da < db {
        a
    } else {
        b
    };

    (da.min(db) - capsule.radius, nearest)
}

impl AnalyticScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(
        &mut self,
        shape: AnalyticShape,
        pose: Transform,
        layers: CollisionLayers,
        sensor: bool,
    ) -> ColliderId {
        let id = ColliderId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            AnalyticEntry {
                shape,
                pose,
                previous: pose,
                layers,
                sensor,
            },
        );
        id
    }

    /// Solid half-space whose surface passes through `point` with outward `normal`.
    ///
    /// The collider pose is `point` with identity rotation, so moving the collider slides the
    /// plane along with it.
    pub fn insert_half_space(
        &mut self,
        point: Vec3,
        normal: Vec3,
        layers: CollisionLayers,
    ) -> ColliderId {
        let normal = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);
        self.insert(
            AnalyticShape::HalfSpace { normal },
            Transform::from_translation(point),
            layers,
            false,
        )
    }

    /// Trigger half-space: stored, never reported by queries.
    pub fn insert_trigger(
        &mut self,
        point: Vec3,
        normal: Vec3,
        layers: CollisionLayers,
    ) -> ColliderId {
        let normal = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);
        self.insert(
            AnalyticShape::HalfSpace { normal },
            Transform::from_translation(point),
            layers,
            true,
        )
    }

    /// Non-collidable body used to hold a character or platform pose.
    pub fn insert_body(&mut self, pose: Transform, layers: CollisionLayers) -> ColliderId {
        self.insert(AnalyticShape::Body, pose, layers, false)
    }

    pub fn remove(&mut self, id: ColliderId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn previous_pose(&self, id: ColliderId) -> Option<Transform> {
        self.entries.get(&id).map(|e| e.previous)
    }

    fn planes<'a>(
        &'a self,
        filter: &'a QueryFilter,
    ) -> impl Iterator<Item = (ColliderId, Vec3, Vec3)> + 'a {
        self.entries.iter().filter_map(move |(&id, entry)| {
            if entry.sensor || !filter.accepts(id, entry.layers) {
                return None;
            }
            entry.plane().map(|(n, p)| (id, n, p))
        })
    }
}

impl CollisionBackend for AnalyticScene {
    fn overlap(
        &self,
        pose: &Transform,
        capsule: &CapsuleSpec,
        filter: &QueryFilter,
    ) -> Vec<ColliderId> {
        self.planes(filter)
            .filter(|&(_, n, p)| capsule_plane_gap(pose, capsule, n, p).0 < 0.0)
            .map(|(id, _, _)| id)
            .collect()
    }

    fn sweep(
        &self,
        pose: &Transform,
        capsule: &CapsuleSpec,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Vec<SweepHit> {
        let mut hits: Vec<SweepHit> = self
            .planes(filter)
            .filter_map(|(id, n, p)| {
                let (gap, nearest) = capsule_plane_gap(pose, capsule, n, p);
                let distance = if gap <= 0.0 {
                    0.0
                } else {
                    let closing = -n.dot(&direction);
                    if closing <= MIN_CLOSING {
                        return None;
                    }
                    gap / closing
                };
                if distance > max_distance {
                    return None;
                }
                Some(SweepHit {
                    collider: id,
                    point: nearest + direction * distance - n * capsule.radius,
                    normal: n,
                    distance,
                })
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn penetration(
        &self,
        pose: &Transform,
        capsule: &CapsuleSpec,
        other: ColliderId,
    ) -> Option<Penetration> {
        let (n, p) = self.entries.get(&other)?.plane()?;
        let (gap, _) = capsule_plane_gap(pose, capsule, n, p);
        (gap < 0.0).then_some(Penetration {
            direction: n,
            depth: -gap,
        })
    }

    fn contains(&self, id: ColliderId) -> bool {
        self.entries.contains_key(&id)
    }

    fn pose(&self, id: ColliderId) -> Option<Transform> {
        self.entries.get(&id).map(|e| e.pose)
    }

    fn teleport(&mut self, id: ColliderId, pose: Transform) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.pose = pose;
            entry.previous = pose;
        }
    }

    fn move_to(&mut self, id: ColliderId, pose: Transform) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.previous = entry.pose;
            entry.pose = pose;
        }
    }
}
