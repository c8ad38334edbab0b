//! Carrying rotation across the packed/unpacked boundary.
//!
//! Packing tears down the rigid bodies, so the inertia needed to turn
//! momentum back into a rate has to be read on the way in. Unpacking
//! recreates them, and impulses applied in that same tick are unstable: the
//! stored momentum is reapplied a fixed number of ticks later instead.

use std::collections::HashMap;

use bevy::log::{debug, info, warn};

use crate::algebra::rate_from_momentum;
use crate::packed::relative_heading;
use crate::{
    ControlMode, PartId, PhysicsHost, RotationConfig, VehicleId, VehicleRecord, VehicleState,
};

/// Snapshot inertia on entering the cheap regime. Any pending reapplication
/// is overwritten.
pub fn on_pack(state: &VehicleState, record: &mut VehicleRecord) {
    record.stored_inertia_diag = state.inertia_diagonal;
    record.clear_pending();
}

/// Restore rotation on leaving the cheap regime.
pub fn on_unpack<H: PhysicsHost + ?Sized>(
    config: &RotationConfig,
    host: &mut H,
    id: VehicleId,
    state: &VehicleState,
    record: &mut VehicleRecord,
    mode: ControlMode,
) {
    if state.situation.is_grounded() {
        return;
    }

    let spinning = record.stored_angular_momentum.norm() >= config.threshold;
    if record.rotation_mode_active && spinning && mode != ControlMode::Autopilot {
        schedule(config, id, record);
    } else if mode != ControlMode::Absolute {
        if mode == ControlMode::Relative && !record.momentum_mode_active {
            let heading = match record.reference {
                Some(reference) => relative_heading(config, &*host, state, record, reference),
                None => None,
            };
            if let Some(heading) = heading {
                host.set_rotation(id, heading);
            }
            let current = host
                .vehicle(id)
                .map_or(state.reference_rotation, |now| now.reference_rotation);
            host.set_hold_heading(id, current);
        } else {
            schedule(config, id, record);
        }
    }
}

fn schedule(config: &RotationConfig, id: VehicleId, record: &mut VehicleRecord) {
    record.schedule_reapply(config.reapply_delay_ticks);
    info!(
        "Reapplying momentum {:?} to {:?} in {} ticks",
        record.pending_reapply_momentum, id, record.pending_countdown
    );
}

/// Count a pending reapplication down by one tick, applying it on the tick
/// the countdown reaches zero. Returns whether it was applied.
pub fn advance_pending<H: PhysicsHost + ?Sized>(
    config: &RotationConfig,
    host: &mut H,
    clamps: &mut ClampRelaxations,
    id: VehicleId,
    state: &VehicleState,
    record: &mut VehicleRecord,
) -> bool {
    if !record.has_pending_reapply() {
        return false;
    }
    record.pending_countdown -= 1;
    if record.pending_countdown > 0 {
        return false;
    }

    reapply(config, host, clamps, id, state, record);
    record.clear_pending();
    true
}

/// Spin every mass-bearing part up to the stored rate as one rigid body about
/// the vehicle's center of mass.
fn reapply<H: PhysicsHost + ?Sized>(
    config: &RotationConfig,
    host: &mut H,
    clamps: &mut ClampRelaxations,
    id: VehicleId,
    state: &VehicleState,
    record: &VehicleRecord,
) {
    let rate = rate_from_momentum(
        &record.pending_reapply_momentum,
        &record.stored_inertia_diag,
        config.inertia_epsilon,
    );
    let rate_world = state.reference_rotation * rate;

    for part in host.parts(id) {
        if !part.carries_mass() {
            debug!("Skipping {:?}: no rigid body", part.id);
            continue;
        }
        clamps.relax(host, part.id, config.clamp_scale, config.clamp_relax_ticks);
        host.add_torque_impulse(part.id, rate_world);
        host.add_force_impulse(
            part.id,
            rate_world.cross(&(part.position - state.center_of_mass)),
        );
    }
}

/// Parts whose angular velocity clamp is temporarily raised.
#[derive(Debug, Default)]
pub struct ClampRelaxations {
    entries: HashMap<PartId, Relaxation>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Relaxation {
    original: f64,
    remaining: u32,
}

impl ClampRelaxations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_relaxed(&self, part: PartId) -> bool {
        self.entries.contains_key(&part)
    }

    /// Scale `part`'s clamp for `ticks` ticks. A part that is already relaxed
    /// only gets its window restarted.
    pub fn relax<H: PhysicsHost + ?Sized>(
        &mut self,
        host: &mut H,
        part: PartId,
        scale: f64,
        ticks: u32,
    ) {
        if let Some(entry) = self.entries.get_mut(&part) {
            entry.remaining = ticks;
            return;
        }
        let Some(original) = host.max_angular_velocity(part) else {
            debug!("No angular velocity clamp on {:?}", part);
            return;
        };
        match host.set_max_angular_velocity(part, original * scale) {
            Ok(()) => {
                self.entries.insert(
                    part,
                    Relaxation {
                        original,
                        remaining: ticks,
                    },
                );
            }
            Err(err) => warn!("Could not relax clamp on {:?}: {}", part, err),
        }
    }

    /// One tick of every window; expired clamps go back to their original
    /// value. Failed restorations are logged and forgotten.
    pub fn advance<H: PhysicsHost + ?Sized>(&mut self, host: &mut H) {
        self.entries.retain(|part, entry| {
            entry.remaining = entry.remaining.saturating_sub(1);
            if entry.remaining > 0 {
                return true;
            }
            match host.set_max_angular_velocity(*part, entry.original) {
                Ok(()) => debug!("Restored clamp on {:?} to {}", part, entry.original),
                Err(err) => warn!("Could not restore clamp on {:?}: {}", part, err),
            }
            false
        });
    }
}
