//! Bookkeeping for vehicles under full rigid-body simulation.

use std::f64::consts::TAU;

use crate::algebra::{rotation_between_with_tolerance, unit_towards};
use crate::{ControlMode, PhysicsHost, RotationConfig, VehicleId, VehicleRecord, VehicleState};

/// One unpacked tick.
pub fn track<H: PhysicsHost + ?Sized>(
    config: &RotationConfig,
    host: &mut H,
    id: VehicleId,
    state: &VehicleState,
    record: &mut VehicleRecord,
    mode: ControlMode,
) {
    capture_momentum(config, state, record, mode);

    if mode == ControlMode::Relative && record.momentum_mode_active {
        let roll = roll_command(config, record.desired_spin_rate, &state.angular_velocity);
        host.set_roll(id, roll);
    }

    record.rotation = state.rotation;
    record.frame_reference_axis = host.frame_reference_axis();

    hold_relative(config, host, id, state, record, mode);
}

/// Angular momentum, not rate: it survives a change of inertia across the
/// transition.
fn capture_momentum(
    config: &RotationConfig,
    state: &VehicleState,
    record: &mut VehicleRecord,
    mode: ControlMode,
) {
    let settled = mode != ControlMode::Off
        && !record.momentum_mode_active
        && state.angular_velocity.norm() < config.threshold;

    record.stored_angular_momentum = if settled {
        na::Vector3::zeros()
    } else {
        state.angular_momentum
    };
}

/// Roll output in `[-1, 1]` driving the spin rate towards `desired_rpm`.
pub fn roll_command(
    config: &RotationConfig,
    desired_rpm: f64,
    angular_velocity: &na::Vector3<f64>,
) -> f64 {
    let rpm = angular_velocity.norm() * 60.0 / TAU;
    if desired_rpm >= 0.0 {
        (config.roll_gain * (desired_rpm - rpm)).clamp(-1.0, 1.0)
    } else {
        -(config.roll_gain * (-desired_rpm - rpm)).clamp(-1.0, 1.0)
    }
}

/// Steer the held heading along with the reference so the engine converges
/// the vehicle onto it.
fn hold_relative<H: PhysicsHost + ?Sized>(
    config: &RotationConfig,
    host: &mut H,
    id: VehicleId,
    state: &VehicleState,
    record: &mut VehicleRecord,
    mode: ControlMode,
) {
    let resolved = record
        .reference
        .filter(|_| record.rotation_mode_active)
        .and_then(|reference| host.object_position(reference));

    let Some(reference_position) = resolved else {
        record.direction = na::Vector3::zeros();
        record.last_relative_position = na::Vector3::zeros();
        record.last_active = false;
        return;
    };

    record.direction = unit_towards(&state.position, &reference_position);
    let relative = state.reference_position - reference_position;

    if mode == ControlMode::Relative && !record.momentum_mode_active {
        if record.last_active && record.reference == record.last_reference {
            let delta = rotation_between_with_tolerance(
                &record.last_relative_position,
                &relative,
                config.antiparallel_tolerance,
            );
            host.set_hold_heading(id, delta * state.hold_heading);
        }
        record.last_active = true;
    } else {
        record.last_active = false;
    }

    record.last_relative_position = relative;
}
