/*!
Collision root module.

The motion solver never talks to a physics engine directly; every geometric question goes
through the [`CollisionBackend`] trait. The code is split for clarity:

- types:        shared data types (Transform, CapsuleSpec, SweepHit, QueryFilter, etc.)
- backend:      the query/pose contract consumed by characters and platforms
- defs:         serializable collider definitions and the rapier collider builder
- narrow_phase: thin wrappers over parry3d queries (shape casts, intersections, contacts)
- scene:        rapier-backed backend for arbitrary shapes
- analytic:     closed-form half-space backend, deterministic to the last bit
*/

pub mod analytic;
pub mod backend;
pub mod defs;
pub mod narrow_phase;
pub mod scene;
pub mod types;

// Re-export commonly used types.
pub use analytic::AnalyticScene;
pub use backend::CollisionBackend;
pub use defs::{ColliderShapeDef, WorldStaticDef};
pub use scene::RapierScene;
pub use types::{
    CapsuleSpec, ColliderId, CollisionLayers, Iso, Penetration, Quat, QueryFilter, SweepHit,
    Transform, Vec3,
};

crate::define_bitmask_flags!(Layer, u32, {
    World,
    Character,
    Platform,
    Trigger,
});

/// Mask with exactly the given layers set.
#[inline]
pub fn layers_of(layers: &[Layer]) -> CollisionLayers {
    CollisionLayers::from_flags(layers)
}
