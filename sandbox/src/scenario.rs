//! Scenario loading and the headless run loop.
//!
//! A scenario is plain JSON: world statics, platforms (shape, pose, motion, optional
//! back-and-forth script) and characters (feet position, tuning, inputs keyed by tick).
//! Missing sections are empty and missing tuning falls back to library defaults.
//!
//! Design notes
//! - Statics are inserted in ascending `id` order so the collider ids, and with them the query
//!   order, do not depend on the order of the file.
//! - Scripted inputs are applied right before the tick they name, in file order.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use kinematics::{
    CharacterConfig, CharacterController, CharacterEvent, CharacterId, ColliderShapeDef,
    KinematicSystem, Layer, MovementState, PlatformController, PlatformMotion, Quat,
    RapierScene, Transform, Vec3, WorldStaticDef, layers_of,
};

use crate::scripts::PingPong;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub statics: Vec<WorldStaticDef>,
    pub platforms: Vec<PlatformDef>,
    pub characters: Vec<CharacterDef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlatformDef {
    pub name: String,
    pub shape: ColliderShapeDef,
    pub pose: Transform,
    #[serde(default)]
    pub motion: PlatformMotion,
    /// Reverse the motion every this many seconds.
    #[serde(default)]
    pub ping_pong_s: Option<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CharacterDef {
    pub name: String,
    pub feet: Vec3,
    #[serde(default)]
    pub config: CharacterConfig,
    #[serde(default)]
    pub inputs: Vec<ScriptedInput>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScriptedInput {
    pub tick: u64,
    #[serde(flatten)]
    pub action: InputAction,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InputAction {
    Move {
        direction: Vec3,
    },
    Jump,
    StopJump,
    Teleport {
        position: Vec3,
        #[serde(default)]
        kill_velocity: bool,
    },
    Look {
        direction: Vec3,
    },
    ForceUnground {
        #[serde(default)]
        duration: Option<f32>,
    },
    SetState {
        state: MovementState,
    },
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing scenario {}", path.display()))
    }

    /// Floor, a ramp, a wall and a shuttling platform, with one character that walks, jumps and
    /// runs into the wall and another that rides the platform.
    pub fn builtin() -> Self {
        let world = layers_of(&[Layer::World]);
        let ramp_tilt = Quat::from_axis_angle(&Vec3::z_axis(), 20f32.to_radians());

        let statics = vec![
            WorldStaticDef {
                id: 1,
                translation: Vec3::new(0.0, -0.5, 0.0),
                rotation: Quat::identity(),
                shape: ColliderShapeDef::Cuboid {
                    half_extents: Vec3::new(40.0, 0.5, 40.0),
                },
                layers: world,
                sensor: false,
            },
            WorldStaticDef {
                id: 2,
                translation: Vec3::new(-8.0, 0.0, 0.0),
                rotation: ramp_tilt,
                shape: ColliderShapeDef::Cuboid {
                    half_extents: Vec3::new(4.0, 0.25, 3.0),
                },
                layers: world,
                sensor: false,
            },
            WorldStaticDef {
                id: 3,
                translation: Vec3::new(10.0, 2.0, 0.0),
                rotation: Quat::identity(),
                shape: ColliderShapeDef::Cuboid {
                    half_extents: Vec3::new(0.5, 2.0, 10.0),
                },
                layers: world,
                sensor: false,
            },
        ];

        let platforms = vec![PlatformDef {
            name: "shuttle".into(),
            shape: ColliderShapeDef::Cuboid {
                half_extents: Vec3::new(1.5, 0.25, 1.5),
            },
            pose: Transform::from_translation(Vec3::new(0.0, 0.25, 8.0)),
            motion: PlatformMotion::linear(Vec3::new(1.5, 0.0, 0.0)),
            ping_pong_s: Some(2.0),
        }];

        let walker = CharacterDef {
            name: "walker".into(),
            feet: Vec3::new(0.0, 1.0, 0.0),
            config: CharacterConfig::default(),
            inputs: vec![
                ScriptedInput {
                    tick: 10,
                    action: InputAction::Move {
                        direction: Vec3::x(),
                    },
                },
                ScriptedInput {
                    tick: 40,
                    action: InputAction::Jump,
                },
                ScriptedInput {
                    tick: 46,
                    action: InputAction::StopJump,
                },
                ScriptedInput {
                    tick: 60,
                    action: InputAction::Jump,
                },
            ],
        };

        let rider = CharacterDef {
            name: "rider".into(),
            feet: Vec3::new(0.0, 0.6, 8.0),
            config: CharacterConfig::default(),
            inputs: Vec::new(),
        };

        Self {
            statics,
            platforms,
            characters: vec![walker, rider],
        }
    }
}

struct Actor {
    name: String,
    id: CharacterId,
    inputs: Vec<ScriptedInput>,
}

/// Final state of one character.
#[derive(Debug, Serialize)]
pub struct CharacterReport {
    pub name: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub heading_deg: f32,
    pub grounded: bool,
    pub state: MovementState,
    pub landings: u32,
    pub falls: u32,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub ticks: u64,
    pub dt: f32,
    pub characters: Vec<CharacterReport>,
}

pub struct Sandbox {
    system: KinematicSystem<RapierScene>,
    actors: Vec<Actor>,
}

impl Sandbox {
    pub fn build(scenario: Scenario) -> Result<Self> {
        let mut scene = RapierScene::new();
        let statics = scenario.statics.len();
        scene.insert_statics(scenario.statics);

        let mut platforms = Vec::with_capacity(scenario.platforms.len());
        for def in scenario.platforms {
            let body = scene.insert_shape(&def.shape, def.pose, layers_of(&[Layer::Platform]));
            let mut platform = PlatformController::new(body, def.motion, def.pose)
                .with_context(|| format!("platform `{}`", def.name))?;
            if let Some(half_period) = def.ping_pong_s {
                platform = platform.with_script(PingPong::new(half_period));
            }
            platforms.push(platform);
        }

        let mut characters = Vec::with_capacity(scenario.characters.len());
        for def in scenario.characters {
            let root = Transform::from_translation(def.feet);
            let body = scene.insert_capsule(
                def.config.capsule(),
                def.config.body_pose(&root),
                layers_of(&[Layer::Character]),
            );
            let character = CharacterController::new(body, def.config, root)
                .with_context(|| format!("character `{}`", def.name))?;
            characters.push((def.name, def.inputs, character));
        }

        let mut system = KinematicSystem::new(scene);
        for platform in platforms {
            system.register_platform(platform)?;
        }

        let mut actors = Vec::with_capacity(characters.len());
        for (name, inputs, character) in characters {
            let id = system
                .register_character(character)
                .with_context(|| format!("registering `{name}`"))?;
            actors.push(Actor { name, id, inputs });
        }

        info!(
            "sandbox ready: {statics} statics, {} platforms, {} characters",
            system.platforms().count(),
            actors.len()
        );
        Ok(Self { system, actors })
    }

    fn apply_inputs(&mut self, tick: u64) {
        for actor in &self.actors {
            for input in actor.inputs.iter().filter(|i| i.tick == tick) {
                let id = actor.id;
                match &input.action {
                    InputAction::Move { direction } => {
                        self.system.input_move(id, *direction);
                    }
                    InputAction::Jump => {
                        self.system.input_jump(id);
                    }
                    InputAction::StopJump => {
                        self.system.input_stop_jump(id);
                    }
                    InputAction::Teleport {
                        position,
                        kill_velocity,
                    } => {
                        self.system.teleport(id, *position, *kill_velocity);
                    }
                    InputAction::Look { direction } => {
                        self.system.look(id, *direction);
                    }
                    InputAction::ForceUnground { duration } => {
                        self.system.force_unground(id, *duration);
                    }
                    InputAction::SetState { state } => {
                        if let Some(character) = self.system.character_mut(id) {
                            character.set_movement_state(*state);
                        }
                    }
                }
            }
        }
    }

    fn name_of(&self, id: CharacterId) -> &str {
        self.actors
            .iter()
            .find(|a| a.id == id)
            .map_or("?", |a| a.name.as_str())
    }

    /// Step `ticks` fixed steps of `dt` seconds and report where everyone ended up.
    pub fn run(&mut self, ticks: u64, dt: f32) -> Report {
        let mut landings = vec![0u32; self.actors.len()];
        let mut falls = vec![0u32; self.actors.len()];

        for tick in 0..ticks {
            self.apply_inputs(tick);
            for event in self.system.tick(dt) {
                let Some(index) = self.actors.iter().position(|a| a.id == event.character())
                else {
                    continue;
                };
                match event {
                    CharacterEvent::Landed(_) => landings[index] += 1,
                    CharacterEvent::BeganFalling(_) => falls[index] += 1,
                }
                info!("tick {tick}: {} {event:?}", self.name_of(event.character()));
            }
        }

        let characters = self
            .actors
            .iter()
            .zip(landings.iter().zip(&falls))
            .filter_map(|(actor, (&landings, &falls))| {
                let c = self.system.character(actor.id)?;
                Some(CharacterReport {
                    name: actor.name.clone(),
                    position: c.position(),
                    velocity: c.velocity(),
                    heading_deg: c.heading_deg(),
                    grounded: c.is_grounded(),
                    state: c.movement_state(),
                    landings,
                    falls,
                })
            })
            .collect();

        Report {
            ticks: self.system.ticks(),
            dt,
            characters,
        }
    }
}
