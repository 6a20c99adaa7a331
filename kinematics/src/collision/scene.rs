//! Rapier-backed collision scene.
//!
//! Colliders live in a rapier `ColliderSet`; queries are parry narrow-phase tests run over
//! every collider in `ColliderId` order. The scene is query-only: it never steps dynamics, and
//! poses change only through [`CollisionBackend::teleport`] / [`CollisionBackend::move_to`].
//!
//! Design goals
//! - Deterministic: insertion order of statics is sorted by definition id and queries iterate a
//!   `BTreeMap`, so identical inputs always give identical outputs.
//! - Moving geometry: character capsules and platform shapes are regular colliders whose poses
//!   the tick orchestrator updates every step.

use std::collections::BTreeMap;

use rapier3d::prelude::{
    Collider, ColliderBuilder, ColliderHandle, ColliderSet, IslandManager, RigidBodySet,
};

use super::{
    backend::CollisionBackend,
    defs::{ColliderShapeDef, WorldStaticDef, collider_from_def},
    narrow_phase,
    types::{
        CapsuleSpec, ColliderId, CollisionLayers, Penetration, QueryFilter, SweepHit, Transform,
        Vec3,
    },
};

struct SceneEntry {
    handle: ColliderHandle,
    layers: CollisionLayers,
    /// Pose before the last authoritative move, for interpolation consumers.
    previous: Transform,
}

pub struct RapierScene {
    colliders: ColliderSet,
    // Only needed to satisfy `ColliderSet::remove`; the scene has no rigid bodies.
    bodies: RigidBodySet,
    islands: IslandManager,
    entries: BTreeMap<ColliderId, SceneEntry>,
    next_id: u32,
}

impl Default for RapierScene {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierScene {
    pub fn new() -> Self {
        Self {
            colliders: ColliderSet::new(),
            bodies: RigidBodySet::new(),
            islands: IslandManager::new(),
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Insert a prebuilt collider. Its current position becomes both previous and current pose.
    pub fn insert(&mut self, collider: Collider, layers: CollisionLayers) -> ColliderId {
        let id = ColliderId(self.next_id);
        self.next_id += 1;

        let previous = Transform::from_iso(collider.position());
        let handle = self.colliders.insert(collider);
        self.entries.insert(
            id,
            SceneEntry {
                handle,
                layers,
                previous,
            },
        );
        id
    }

    pub fn insert_static(&mut self, def: &WorldStaticDef) -> ColliderId {
        let collider = collider_from_def(&def.shape, &def.transform(), def.sensor);
        self.insert(collider, def.layers)
    }

    /// Insert a batch of statics in ascending definition id order.
    pub fn insert_statics(&mut self, mut defs: Vec<WorldStaticDef>) -> Vec<ColliderId> {
        defs.sort_by_key(|d| d.id);
        defs.iter().map(|def| self.insert_static(def)).collect()
    }

    /// Insert a movable, solid shape (platform geometry) at `pose`.
    pub fn insert_shape(
        &mut self,
        shape: &ColliderShapeDef,
        pose: Transform,
        layers: CollisionLayers,
    ) -> ColliderId {
        self.insert(collider_from_def(shape, &pose, false), layers)
    }

    /// Insert a character body capsule centred at `pose`.
    pub fn insert_capsule(
        &mut self,
        capsule: CapsuleSpec,
        pose: Transform,
        layers: CollisionLayers,
    ) -> ColliderId {
        let mut collider = ColliderBuilder::capsule_y(capsule.half_height, capsule.radius).build();
        collider.set_position(pose.iso());
        self.insert(collider, layers)
    }

    pub fn remove(&mut self, id: ColliderId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        self.colliders
            .remove(entry.handle, &mut self.islands, &mut self.bodies, false)
            .is_some()
    }

    /// Pose the collider had before its last authoritative move.
    pub fn previous_pose(&self, id: ColliderId) -> Option<Transform> {
        self.entries.get(&id).map(|e| e.previous)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Solid colliders accepted by `filter`, in id order.
    fn candidates<'a>(
        &'a self,
        filter: &'a QueryFilter,
    ) -> impl Iterator<Item = (ColliderId, &'a Collider)> + 'a {
        self.entries.iter().filter_map(move |(&id, entry)| {
            let collider = self.colliders.get(entry.handle)?;
            (!collider.is_sensor() && filter.accepts(id, entry.layers)).then_some((id, collider))
        })
    }

    fn set_pose(&mut self, id: ColliderId, pose: Transform) {
        let Some(entry) = self.entries.get(&id) else {
            log::debug!("pose write for unknown collider {:?}", id);
            return;
        };
        if let Some(collider) = self.colliders.get_mut(entry.handle) {
            collider.set_position(pose.iso());
        }
    }
}

impl CollisionBackend for RapierScene {
    fn overlap(
        &self,
        pose: &Transform,
        capsule: &CapsuleSpec,
        filter: &QueryFilter,
    ) -> Vec<ColliderId> {
        let shape = narrow_phase::capsule_shape(capsule);
        self.candidates(filter)
            .filter(|(_, collider)| {
                narrow_phase::capsule_intersects(pose, &shape, collider.position(), collider.shape())
            })
            .map(|(id, _)| id)
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
        let shape = narrow_phase::capsule_shape(capsule);
        let mut hits: Vec<SweepHit> = self
            .candidates(filter)
            .filter_map(|(id, collider)| {
                narrow_phase::cast_capsule(
                    pose,
                    &shape,
                    direction,
                    max_distance,
                    collider.position(),
                    collider.shape(),
                )
                .map(|contact| SweepHit {
                    collider: id,
                    point: contact.point,
                    normal: contact.normal,
                    distance: contact.distance,
                })
            })
            .collect();

        // Stable sort keeps id order between equidistant hits.
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn penetration(
        &self,
        pose: &Transform,
        capsule: &CapsuleSpec,
        other: ColliderId,
    ) -> Option<Penetration> {
        let entry = self.entries.get(&other)?;
        let collider = self.colliders.get(entry.handle)?;
        let shape = narrow_phase::capsule_shape(capsule);
        narrow_phase::capsule_penetration(pose, &shape, collider.position(), collider.shape())
    }

    fn contains(&self, id: ColliderId) -> bool {
        self.entries.contains_key(&id)
    }

    fn pose(&self, id: ColliderId) -> Option<Transform> {
        let entry = self.entries.get(&id)?;
        self.colliders
            .get(entry.handle)
            .map(|c| Transform::from_iso(c.position()))
    }

    fn teleport(&mut self, id: ColliderId, pose: Transform) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.previous = pose;
        }
        self.set_pose(id, pose);
    }

    fn move_to(&mut self, id: ColliderId, pose: Transform) {
        let Some(current) = self.pose(id) else {
            return;
        };
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.previous = current;
        }
        self.set_pose(id, pose);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground(scene: &mut RapierScene) -> ColliderId {
        scene.insert_static(&WorldStaticDef {
            id: 1,
            translation: Vec3::zeros(),
            rotation: crate::collision::Quat::identity(),
            shape: ColliderShapeDef::Cuboid {
                half_extents: Vec3::new(50.0, 0.5, 50.0),
            },
            layers: CollisionLayers::all(),
            sensor: false,
        })
    }

    fn capsule() -> CapsuleSpec {
        CapsuleSpec {
            radius: 0.5,
            half_height: 0.5,
        }
    }

    #[test]
    fn downward_sweep_reports_floor_distance() {
        let mut scene = RapierScene::new();
        let floor = ground(&mut scene);

        // Capsule bottom at y = 2.0, floor top at y = 0.5.
        let pose = Transform::from_translation(Vec3::new(0.0, 3.0, 0.0));
        let filter = QueryFilter::new(CollisionLayers::all(), None);
        let hits = scene.sweep(&pose, &capsule(), -Vec3::y(), 5.0, &filter);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].collider, floor);
        assert!((hits[0].distance - 1.5).abs() < 1.0e-3);
        assert!(hits[0].normal.y > 0.99);
    }

    #[test]
    fn excluded_and_sensor_colliders_are_ignored() {
        let mut scene = RapierScene::new();
        let floor = ground(&mut scene);
        scene.insert_static(&WorldStaticDef {
            id: 2,
            translation: Vec3::new(0.0, 1.5, 0.0),
            rotation: crate::collision::Quat::identity(),
            shape: ColliderShapeDef::Sphere { radius: 2.0 },
            layers: CollisionLayers::all(),
            sensor: true,
        });

        let pose = Transform::from_translation(Vec3::new(0.0, 1.2, 0.0));
        let all = QueryFilter::new(CollisionLayers::all(), None);
        assert_eq!(scene.overlap(&pose, &capsule(), &all), vec![floor]);

        let without_floor = QueryFilter::new(CollisionLayers::all(), Some(floor));
        assert!(scene.overlap(&pose, &capsule(), &without_floor).is_empty());
    }

    #[test]
    fn penetration_points_out_of_the_floor() {
        let mut scene = RapierScene::new();
        let floor = ground(&mut scene);

        // Capsule bottom at 0.3, floor top at 0.5: 0.2 deep.
        let pose = Transform::from_translation(Vec3::new(0.0, 1.3, 0.0));
        let pen = scene
            .penetration(&pose, &capsule(), floor)
            .expect("capsule overlaps the floor");

        assert!(pen.direction.y > 0.99);
        assert!((pen.depth - 0.2).abs() < 1.0e-3);
    }

    #[test]
    fn move_to_keeps_previous_pose() {
        let mut scene = RapierScene::new();
        let body = scene.insert_capsule(
            capsule(),
            Transform::from_translation(Vec3::new(0.0, 5.0, 0.0)),
            CollisionLayers::all(),
        );

        scene.move_to(body, Transform::from_translation(Vec3::new(1.0, 5.0, 0.0)));
        assert_eq!(
            scene.previous_pose(body).map(|p| p.translation),
            Some(Vec3::new(0.0, 5.0, 0.0))
        );

        scene.teleport(body, Transform::from_translation(Vec3::new(3.0, 5.0, 0.0)));
        assert_eq!(
            scene.previous_pose(body).map(|p| p.translation),
            Some(Vec3::new(3.0, 5.0, 0.0))
        );

        assert!(scene.remove(body));
        assert!(!scene.contains(body));
    }
}
