//! Scripted sequences of host events for the demo world.

use std::path::{Path, PathBuf};

use anyhow::Context;
use bevy::prelude::*;
use na::Vector3;
use serde::{Deserialize, Serialize};
use sim_rotation::{ObjectId, RotationContext, VehicleId};

use crate::demo::{DemoWorld, VesselSpec};
use crate::plugin::{HostEvent, RotationSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Spawn {
        id: VehicleId,
        #[serde(default)]
        vessel: VesselSpec,
    },
    Pack {
        id: VehicleId,
    },
    Unpack {
        id: VehicleId,
    },
    Destroy {
        id: VehicleId,
    },
    /// Choose what the vehicle keeps its orientation relative to.
    Reference {
        id: VehicleId,
        reference: Option<ObjectId>,
    },
    /// Toggle the vehicle's rotation and momentum modes.
    Modes {
        id: VehicleId,
        rotation: bool,
        momentum: bool,
        #[serde(default)]
        spin_rpm: f64,
    },
    Hold {
        id: VehicleId,
        enabled: bool,
    },
    Warp {
        rate: f64,
    },
    Save,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub tick: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub steps: Vec<Step>,
    /// The app exits once this many ticks have run.
    pub end_tick: u64,
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,
}

fn default_save_path() -> PathBuf {
    PathBuf::from("rotation-save.json")
}

impl Scenario {
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let mut scenario: Scenario = serde_json::from_str(&text)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        scenario.steps.sort_by_key(|s| s.tick);
        Ok(scenario)
    }

    /// A spinning vessel goes on rails and comes back, while a second one
    /// holds its attitude relative to it until it is destroyed.
    pub fn builtin() -> Self {
        let spinner = VehicleId(1);
        let follower = VehicleId(2);
        let step = |tick, action| Step { tick, action };
        Scenario {
            steps: vec![
                step(
                    0,
                    Action::Spawn {
                        id: spinner,
                        vessel: VesselSpec {
                            angular_velocity: Vector3::new(0.0, 0.2, 0.4),
                            ..Default::default()
                        },
                    },
                ),
                step(
                    0,
                    Action::Spawn {
                        id: follower,
                        vessel: VesselSpec {
                            position: Vector3::new(7000.0, 50.0, 0.0),
                            hold_enabled: true,
                            ..Default::default()
                        },
                    },
                ),
                step(
                    5,
                    Action::Reference {
                        id: follower,
                        reference: Some(ObjectId::Vehicle(spinner)),
                    },
                ),
                step(50, Action::Pack { id: spinner }),
                step(60, Action::Warp { rate: 10.0 }),
                step(140, Action::Warp { rate: 1.0 }),
                step(150, Action::Unpack { id: spinner }),
                step(200, Action::Save),
                step(220, Action::Destroy { id: spinner }),
            ],
            end_tick: 240,
            save_path: default_save_path(),
        }
    }
}

/// Runs the scenario script and the demo physics step.
pub struct ScenarioPlugin {
    pub scenario: Scenario,
}

impl Plugin for ScenarioPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.scenario.clone());
        app.init_resource::<DemoWorld>();
        app.add_systems(
            FixedUpdate,
            (
                run_script.before(RotationSet),
                (step_world, report).chain().after(RotationSet),
            ),
        );
    }
}

fn run_script(
    mut tick: Local<u64>,
    scenario: Res<Scenario>,
    mut world: ResMut<DemoWorld>,
    mut ctx: ResMut<RotationContext>,
    mut events: MessageWriter<HostEvent>,
    mut exit: MessageWriter<AppExit>,
) {
    let now = *tick;
    *tick += 1;
    if now >= scenario.end_tick {
        exit.write(AppExit::Success);
        return;
    }

    for step in scenario.steps.iter().filter(|s| s.tick == now) {
        info!("tick {now}: {:?}", step.action);
        match &step.action {
            Action::Spawn { id, vessel } => {
                world.spawn(*id, vessel);
                events.write(HostEvent::Created(*id));
            }
            Action::Pack { id } => {
                if world.request_pack(*id) {
                    events.write(HostEvent::GoOnRails(*id));
                }
            }
            Action::Unpack { id } => {
                if world.unpack(*id) {
                    events.write(HostEvent::GoOffRails(*id));
                }
            }
            Action::Destroy { id } => {
                events.write(HostEvent::WillDestroy(*id));
                world.despawn(*id);
            }
            Action::Reference { id, reference } => {
                ctx.record_mut(*id).reference = *reference;
            }
            Action::Modes {
                id,
                rotation,
                momentum,
                spin_rpm,
            } => {
                let record = ctx.record_mut(*id);
                record.rotation_mode_active = *rotation;
                record.momentum_mode_active = *momentum;
                record.desired_spin_rate = *spin_rpm;
            }
            Action::Hold { id, enabled } => {
                if let Some(vessel) = world.vessels.get_mut(id) {
                    vessel.hold_enabled = *enabled;
                }
            }
            Action::Warp { rate } => world.warp = *rate,
            Action::Save => {
                events.write(HostEvent::SaveRequested);
            }
        }
    }
}

fn step_world(mut world: ResMut<DemoWorld>) {
    world.step();
}

fn report(world: Res<DemoWorld>, ctx: Res<RotationContext>) {
    if ctx.ticks() % 50 != 0 {
        return;
    }
    for (id, vessel) in &world.vessels {
        let Some(record) = ctx.record(*id) else {
            continue;
        };
        debug!(
            "{:?} packed={} omega={:.3} stored L={:.3}",
            id,
            vessel.packed,
            vessel.attitude.omega_b().norm(),
            record.stored_angular_momentum.norm()
        );
    }
}
