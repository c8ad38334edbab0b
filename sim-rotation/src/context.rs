//! The per-simulation rotation state and its fixed-step loop.

use bevy::log::{info, warn};
use bevy::prelude::Resource;

use crate::algebra::unit_towards;
use crate::persist::{SavedState, SavedVehicle};
use crate::transition::{self, ClampRelaxations};
use crate::{
    Addons, ControlStatus, ExternalModes, ObjectId, PhysicsHost, RecordStore, RotationConfig,
    VehicleId, VehicleRecord, VehicleState, classify, packed, unpacked,
};

/// Owns every vehicle record for one simulation session.
///
/// Construct it when the simulation starts and drop it when it ends. The
/// host calls [`RotationContext::tick`] once per fixed physics step and the
/// `on_*` handlers as lifecycle events arrive between steps.
#[derive(Debug, Default, Resource)]
pub struct RotationContext {
    config: RotationConfig,
    store: RecordStore,
    clamps: ClampRelaxations,
    tick: u64,
}

impl RotationContext {
    pub fn new(config: RotationConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn clamps(&self) -> &ClampRelaxations {
        &self.clamps
    }

    pub fn record(&self, id: VehicleId) -> Option<&VehicleRecord> {
        self.store.get(id)
    }

    /// The record for `id`, created on first use. This is where user settings
    /// (reference, modes, desired spin rate) are written.
    pub fn record_mut(&mut self, id: VehicleId) -> &mut VehicleRecord {
        self.store.find_or_insert(id)
    }

    /// Run one fixed step over every live vehicle.
    pub fn tick<H: PhysicsHost + ?Sized>(&mut self, host: &mut H, addons: &Addons<'_>) {
        let Self {
            config,
            store,
            clamps,
            tick,
        } = self;

        store.mark_all_unseen();
        store.run_deferred(*tick, |id| host.vehicle(id).is_some());

        for id in host.vehicles() {
            let ready = store.is_ready(id);
            let record = store.find_or_insert(id);
            record.seen_this_tick = true;
            if !ready {
                continue;
            }

            let Some(state) = host.vehicle(id) else {
                warn!("Host listed {:?} but has no state for it", id);
                continue;
            };

            record.external_modes = ExternalModes::query(addons, id);
            let mode = classify(&ControlStatus::from(&state), &record.external_modes);

            if record.dynamic_reference {
                follow_primary_body(&*host, id, &state, record);
            }

            if state.packed {
                if state.loaded {
                    packed::propagate(config, host, id, &state, record, mode);
                }
                record.last_active = false;
            } else {
                transition::advance_pending(config, host, clamps, id, &state, record);
                unpacked::track(config, host, id, &state, record, mode);
            }

            record.last_reference = record.reference;
        }

        clamps.advance(host);
        store.reap_unseen();
        *tick += 1;
    }

    /// A vehicle was created. Its record becomes active on the next tick.
    pub fn on_vehicle_created(&mut self, id: VehicleId) {
        self.store.defer(id, self.tick);
    }

    /// A vehicle is about to be destroyed: forget it and drop it as a
    /// reference everywhere else.
    pub fn on_vehicle_destroyed(&mut self, id: VehicleId) {
        let cleared = self.store.clear_reference(ObjectId::Vehicle(id));
        if cleared > 0 {
            info!("Deleted {:?} as reference of {} vehicles", id, cleared);
        }
        self.store.remove(id);
    }

    /// A vehicle entered the cheap regime.
    pub fn on_enter_packed<H: PhysicsHost + ?Sized>(&mut self, host: &H, id: VehicleId) {
        let Some(state) = host.vehicle(id) else {
            warn!("Cannot pack unknown vehicle {:?}", id);
            return;
        };
        transition::on_pack(&state, self.store.find_or_insert(id));
    }

    /// A vehicle left the cheap regime and is fully simulated again.
    pub fn on_leave_packed<H: PhysicsHost + ?Sized>(
        &mut self,
        host: &mut H,
        addons: &Addons<'_>,
        id: VehicleId,
    ) {
        let Some(state) = host.vehicle(id) else {
            warn!("Cannot unpack unknown vehicle {:?}", id);
            return;
        };
        let record = self.store.find_or_insert(id);
        record.external_modes = ExternalModes::query(addons, id);
        let mode = classify(&ControlStatus::from(&state), &record.external_modes);
        transition::on_unpack(&self.config, host, id, &state, record, mode);
    }

    pub fn save_state(&self) -> SavedState {
        let mut vehicles: Vec<SavedVehicle> = self
            .store
            .iter()
            .map(|(id, record)| SavedVehicle {
                id: *id,
                record: record.clone(),
            })
            .collect();
        vehicles.sort_by_key(|saved| saved.id);
        info!("Saving rotation state of {} vehicles", vehicles.len());
        SavedState::new(vehicles)
    }

    /// Replace all records with a saved state.
    pub fn load_state(&mut self, saved: SavedState) {
        self.store = RecordStore::new();
        for SavedVehicle { id, record } in saved.vehicles {
            self.store.insert(id, record);
        }
    }
}

/// Keep the reference on the body the vehicle currently orbits.
fn follow_primary_body<H: PhysicsHost + ?Sized>(
    host: &H,
    id: VehicleId,
    state: &VehicleState,
    record: &mut VehicleRecord,
) {
    let primary = ObjectId::Body(state.primary_body);
    if record.reference == Some(primary) {
        return;
    }
    info!(
        "Updated the reference of {:?} from {:?} to {:?}",
        id, record.reference, primary
    );
    record.reference = Some(primary);
    record.direction = host
        .object_position(primary)
        .map_or_else(na::Vector3::zeros, |body| unit_towards(&state.position, &body));
    record.rotation = state.rotation;
    record.frame_reference_axis = host.frame_reference_axis();
    record.last_active = false;
}
