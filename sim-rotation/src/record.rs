//! Per-vehicle rotation bookkeeping.

use std::collections::HashMap;

use bevy::log::debug;
use na::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::{ExternalModes, ObjectId, VehicleId};

/// Everything remembered about one vehicle between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub reference: Option<ObjectId>,
    /// Re-point `reference` at the primary body every tick.
    pub dynamic_reference: bool,
    pub rotation_mode_active: bool,
    pub momentum_mode_active: bool,
    /// Signed target roll rate in revolutions per minute.
    pub desired_spin_rate: f64,
    /// Vehicle-frame angular momentum, captured while unpacked.
    pub stored_angular_momentum: Vector3<f64>,
    /// Captured on packing; unreadable afterwards.
    pub stored_inertia_diag: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub direction: Vector3<f64>,
    pub frame_reference_axis: Vector3<f64>,
    pub last_active: bool,
    pub last_reference: Option<ObjectId>,
    pub last_relative_position: Vector3<f64>,
    /// -1 when no reapplication is pending.
    pub pending_countdown: i32,
    pub pending_reapply_momentum: Vector3<f64>,

    #[serde(skip)]
    pub external_modes: ExternalModes,
    #[serde(skip)]
    pub seen_this_tick: bool,
}

impl Default for VehicleRecord {
    fn default() -> Self {
        Self {
            reference: None,
            dynamic_reference: false,
            rotation_mode_active: true,
            momentum_mode_active: false,
            desired_spin_rate: 0.0,
            stored_angular_momentum: Vector3::zeros(),
            stored_inertia_diag: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            direction: Vector3::zeros(),
            frame_reference_axis: Vector3::x(),
            last_active: false,
            last_reference: None,
            last_relative_position: Vector3::zeros(),
            pending_countdown: -1,
            pending_reapply_momentum: Vector3::zeros(),
            external_modes: ExternalModes::default(),
            seen_this_tick: false,
        }
    }
}

impl VehicleRecord {
    /// A reapplication is outstanding and not yet applied.
    pub fn has_pending_reapply(&self) -> bool {
        self.pending_countdown > 0
    }

    pub fn schedule_reapply(&mut self, delay_ticks: i32) {
        self.pending_countdown = delay_ticks;
        self.pending_reapply_momentum = self.stored_angular_momentum;
    }

    pub fn clear_pending(&mut self) {
        self.pending_countdown = -1;
        self.pending_reapply_momentum = Vector3::zeros();
    }

    /// Forget the previous tick so no stale delta is applied.
    fn reset_history(&mut self) {
        self.last_relative_position = Vector3::zeros();
        self.last_active = false;
        self.last_reference = None;
    }
}

/// All records, keyed by vehicle.
///
/// Records of freshly created vehicles are held back until the tick after
/// their creation: the host has no valid transform for them before that.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<VehicleId, VehicleRecord>,
    /// Vehicles awaiting their deferred initializer, with the tick they were
    /// created on.
    deferred: Vec<(VehicleId, u64)>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: VehicleId) -> Option<&VehicleRecord> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: VehicleId) -> Option<&mut VehicleRecord> {
        self.records.get_mut(&id)
    }

    /// The record for `id`, created with defaults on first lookup.
    pub fn find_or_insert(&mut self, id: VehicleId) -> &mut VehicleRecord {
        self.records.entry(id).or_insert_with(|| {
            debug!("Creating rotation record for {:?}", id);
            VehicleRecord::default()
        })
    }

    pub fn insert(&mut self, id: VehicleId, record: VehicleRecord) {
        self.records.insert(id, record);
    }

    pub fn remove(&mut self, id: VehicleId) -> Option<VehicleRecord> {
        self.deferred.retain(|(deferred, _)| *deferred != id);
        self.records.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VehicleId, &VehicleRecord)> {
        self.records.iter()
    }

    /// Queue the deferred initializer for a vehicle created on `tick`.
    pub fn defer(&mut self, id: VehicleId, tick: u64) {
        self.find_or_insert(id);
        if !self.deferred.iter().any(|(deferred, _)| *deferred == id) {
            self.deferred.push((id, tick));
        }
    }

    pub fn is_ready(&self, id: VehicleId) -> bool {
        !self.deferred.iter().any(|(deferred, _)| *deferred == id)
    }

    /// Run deferred initializers queued before `tick`.
    ///
    /// Vehicles for which `exists` is false were destroyed in the meantime;
    /// their records are left for the end-of-tick reap.
    pub fn run_deferred(&mut self, tick: u64, mut exists: impl FnMut(VehicleId) -> bool) {
        let (due, waiting): (Vec<_>, Vec<_>) = self
            .deferred
            .drain(..)
            .partition(|(_, created)| *created < tick);
        self.deferred = waiting;

        for (id, _) in due {
            if !exists(id) {
                continue;
            }
            if let Some(record) = self.records.get_mut(&id) {
                record.reset_history();
            }
        }
    }

    pub fn mark_all_unseen(&mut self) {
        for record in self.records.values_mut() {
            record.seen_this_tick = false;
        }
    }

    /// Drop every record not visited this tick. Returns how many went.
    pub fn reap_unseen(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|id, record| {
            if !record.seen_this_tick {
                debug!("Reaping rotation record for {:?}", id);
            }
            record.seen_this_tick
        });
        let records = &self.records;
        self.deferred.retain(|(id, _)| records.contains_key(id));
        before - self.records.len()
    }

    /// Clear `reference` on every record pointing at `target`, except
    /// `target`'s own. Returns how many were cleared.
    pub fn clear_reference(&mut self, target: ObjectId) -> usize {
        let mut cleared = 0;
        for (id, record) in self.records.iter_mut() {
            if ObjectId::Vehicle(*id) == target {
                continue;
            }
            if record.reference == Some(target) {
                record.reference = None;
                cleared += 1;
            }
        }
        cleared
    }
}
