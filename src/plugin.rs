//! Wiring of the rotation bookkeeping into a bevy app.
//!
//! Lifecycle notifications arrive as [`HostEvent`] messages and are handled
//! before the fixed-step tick, in the order they were written. A save file at
//! the save path is loaded when the plugin is built.

use std::marker::PhantomData;
use std::path::PathBuf;

use bevy::prelude::*;
use sim_rotation::{Addons, PhysicsHost, RotationConfig, RotationContext, SavedState, VehicleId};

/// Notifications from the host physics engine.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Created(VehicleId),
    WillDestroy(VehicleId),
    /// Sent before the vehicle is packed, while its inertia is still readable.
    GoOnRails(VehicleId),
    /// Sent after the vehicle is unpacked.
    GoOffRails(VehicleId),
    SaveRequested,
}

/// Systems that run the rotation bookkeeping. Host physics should run after.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct RotationSet;

/// Where [`HostEvent::SaveRequested`] writes to.
#[derive(Resource, Debug, Clone)]
pub struct SaveTarget(pub PathBuf);

/// Runs a [`RotationContext`] against the host resource `H`.
pub struct RotationPlugin<H> {
    config: RotationConfig,
    save_path: PathBuf,
    _host: PhantomData<fn() -> H>,
}

impl<H> RotationPlugin<H> {
    pub fn new(config: RotationConfig) -> Self {
        Self {
            config,
            save_path: PathBuf::from("rotation-save.json"),
            _host: PhantomData,
        }
    }

    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = path.into();
        self
    }
}

impl<H: PhysicsHost + Resource> Plugin for RotationPlugin<H> {
    fn build(&self, app: &mut App) {
        let mut ctx = RotationContext::new(self.config.clone());
        if self.save_path.exists() {
            match SavedState::read(&self.save_path) {
                Ok(saved) => {
                    info!(
                        "loaded rotation state of {} vehicles from {}",
                        saved.vehicles.len(),
                        self.save_path.display()
                    );
                    ctx.load_state(saved);
                }
                Err(e) => warn!(
                    "ignoring rotation save {}: {e}",
                    self.save_path.display()
                ),
            }
        }
        app.insert_resource(ctx);
        app.insert_resource(SaveTarget(self.save_path.clone()));
        app.add_message::<HostEvent>();
        app.add_systems(
            FixedUpdate,
            (dispatch_host_events::<H>, rotation_tick::<H>)
                .chain()
                .in_set(RotationSet),
        );
    }
}

fn dispatch_host_events<H: PhysicsHost + Resource>(
    mut events: MessageReader<HostEvent>,
    mut ctx: ResMut<RotationContext>,
    mut host: ResMut<H>,
    target: Res<SaveTarget>,
) {
    let addons = Addons::default();
    for event in events.read() {
        match *event {
            HostEvent::Created(id) => ctx.on_vehicle_created(id),
            HostEvent::WillDestroy(id) => ctx.on_vehicle_destroyed(id),
            HostEvent::GoOnRails(id) => ctx.on_enter_packed(&*host, id),
            HostEvent::GoOffRails(id) => ctx.on_leave_packed(&mut *host, &addons, id),
            HostEvent::SaveRequested => match ctx.save_state().write(&target.0) {
                Ok(()) => info!("saved rotation state to {}", target.0.display()),
                Err(e) => error!("failed to save rotation state: {e}"),
            },
        }
    }
}

fn rotation_tick<H: PhysicsHost + Resource>(
    mut ctx: ResMut<RotationContext>,
    mut host: ResMut<H>,
) {
    ctx.tick(&mut *host, &Addons::default());
}
