//! Analytic rotation for vehicles in the cheap regime.

use na::{UnitQuaternion, Vector3};

use crate::algebra::{
    frame_shift, rate_from_momentum, rotation_about, rotation_between_with_tolerance,
    unit_towards,
};
use crate::{
    ControlMode, ObjectId, PhysicsHost, RotationConfig, VehicleId, VehicleRecord, VehicleState,
};

/// One packed tick. Only called for loaded vehicles.
pub fn propagate<H: PhysicsHost + ?Sized>(
    config: &RotationConfig,
    host: &mut H,
    id: VehicleId,
    state: &VehicleState,
    record: &mut VehicleRecord,
    mode: ControlMode,
) {
    let at_rest = record.stored_angular_momentum.norm() < config.threshold;

    let rotation = if at_rest && mode.is_directional() {
        snap_align(config, host, state, mode)
    } else if !at_rest && mode != ControlMode::Autopilot {
        Some(spin(config, host, state, record))
    } else if at_rest
        && mode == ControlMode::Relative
        && record.rotation_mode_active
        && !record.momentum_mode_active
    {
        match record.reference {
            // A changed reference has no valid relative heading yet; hold.
            Some(reference) if Some(reference) == record.last_reference => {
                relative_heading(config, host, state, record, reference)
            }
            _ => None,
        }
    } else {
        Some(spin(config, host, state, record))
    };

    if let Some(rotation) = rotation.filter(|_| !state.situation.is_grounded()) {
        host.set_rotation(id, rotation);
    }

    record.last_active = false;
}

/// Analytic spin about the stored momentum axis.
fn spin<H: PhysicsHost + ?Sized>(
    config: &RotationConfig,
    host: &H,
    state: &VehicleState,
    record: &VehicleRecord,
) -> UnitQuaternion<f64> {
    let rate = rate_from_momentum(
        &record.stored_angular_momentum,
        &record.stored_inertia_diag,
        config.inertia_epsilon,
    );
    let angle = rate.norm() * host.fixed_delta_time() * host.time_warp_rate();
    // World momentum stays fixed while the body turns about it.
    let axis = state.reference_rotation * record.stored_angular_momentum;
    rotation_about(&axis, angle) * state.rotation
}

/// Point the forward axis straight along the hold's target vector.
fn snap_align<H: PhysicsHost + ?Sized>(
    config: &RotationConfig,
    host: &H,
    state: &VehicleState,
    mode: ControlMode,
) -> Option<UnitQuaternion<f64>> {
    let radial_out = || {
        host.object_position(ObjectId::Body(state.primary_body))
            .map(|body| state.position - body)
    };
    let (forward, target) = match mode {
        ControlMode::Prograde => (state.forward, state.orbital_velocity),
        ControlMode::Retrograde => (-state.forward, state.orbital_velocity),
        ControlMode::RadialOut => (state.forward, radial_out()?),
        ControlMode::RadialIn => (-state.forward, radial_out()?),
        _ => return None,
    };
    if target.norm_squared() == 0.0 {
        return None;
    }
    let align = rotation_between_with_tolerance(&forward, &target, config.antiparallel_tolerance);
    Some(align * state.rotation)
}

/// The snapshot orientation carried along with the reference, corrected for
/// global-frame drift since the snapshot was taken.
pub(crate) fn relative_heading<H: PhysicsHost + ?Sized>(
    config: &RotationConfig,
    host: &H,
    state: &VehicleState,
    record: &VehicleRecord,
    reference: ObjectId,
) -> Option<UnitQuaternion<f64>> {
    let reference_position = host.object_position(reference)?;
    let shift = frame_shift(&record.frame_reference_axis, &host.frame_reference_axis());
    let now: Vector3<f64> = unit_towards(&state.position, &reference_position);
    let correction = rotation_between_with_tolerance(
        &(shift * record.direction),
        &now,
        config.antiparallel_tolerance,
    );
    Some(correction * (shift * record.rotation))
}
