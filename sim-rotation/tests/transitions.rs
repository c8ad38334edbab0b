mod common;

use approx::assert_relative_eq;
use nalgebra::{UnitQuaternion, Vector3};
use sim_rotation::{
    Addons, BodyId, ObjectId, PartId, RemoteFlightMode, RemoteLinkAddon, RotationConfig,
    RotationContext, Situation, VehicleId,
};

use common::{EngagedAutopilot, MockHost, flying_state, part};

fn context() -> RotationContext {
    RotationContext::new(RotationConfig::default())
}

fn tick(ctx: &mut RotationContext, host: &mut MockHost) {
    ctx.tick(host, &Addons::default());
}

/// A packed-then-unpacked vehicle with momentum (0, 0.2, 0), unit inertia and
/// a reference frame pitched a quarter turn about x.
fn spinning_setup() -> (RotationContext, MockHost) {
    let mut state = flying_state();
    state.reference_rotation =
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::FRAC_PI_2);
    let parts = vec![
        part(10, Vector3::new(1.0, 0.0, 0.0)),
        part(11, Vector3::new(-1.0, 0.0, 0.0)),
    ];
    let host = MockHost::new().with_vehicle(1, state, parts);

    let mut ctx = context();
    {
        let record = ctx.record_mut(VehicleId(1));
        record.stored_angular_momentum = Vector3::new(0.0, 0.2, 0.0);
        record.stored_inertia_diag = Vector3::new(1.0, 1.0, 1.0);
    }
    (ctx, host)
}

#[test]
fn test_momentum_reapplied_exactly_three_ticks_after_unpack() {
    let (mut ctx, mut host) = spinning_setup();

    ctx.on_leave_packed(&mut host, &Addons::default(), VehicleId(1));

    assert!(host.rotation_writes.is_empty(), "no snap on entry");
    assert_eq!(ctx.record(VehicleId(1)).unwrap().pending_countdown, 3);

    tick(&mut ctx, &mut host);
    assert_eq!(ctx.record(VehicleId(1)).unwrap().pending_countdown, 2);
    tick(&mut ctx, &mut host);
    assert_eq!(ctx.record(VehicleId(1)).unwrap().pending_countdown, 1);
    assert!(host.torque_impulses.is_empty());

    tick(&mut ctx, &mut host);
    let record = ctx.record(VehicleId(1)).unwrap();
    assert_eq!(record.pending_countdown, -1);
    assert_eq!(record.pending_reapply_momentum, Vector3::zeros());

    // (0, 0.2, 0) through a quarter turn about x.
    let expected = Vector3::new(0.0, 0.0, 0.2);
    assert_eq!(host.torque_impulses.len(), 2);
    for (_, impulse) in &host.torque_impulses {
        assert_relative_eq!(*impulse, expected, epsilon = 1e-12);
    }

    // Linear impulses turn the parts about the center of mass.
    let forces: Vec<_> = host.force_impulses.iter().map(|(_, f)| *f).collect();
    assert_relative_eq!(forces[0], Vector3::new(0.0, 0.2, 0.0), epsilon = 1e-12);
    assert_relative_eq!(forces[1], Vector3::new(0.0, -0.2, 0.0), epsilon = 1e-12);

    tick(&mut ctx, &mut host);
    assert_eq!(host.torque_impulses.len(), 2, "applied once");
}

#[test]
fn test_momentum_at_threshold_is_reapplied() {
    let (mut ctx, mut host) = spinning_setup();
    ctx.record_mut(VehicleId(1)).stored_angular_momentum = Vector3::new(0.0, 0.05, 0.0);

    ctx.on_leave_packed(&mut host, &Addons::default(), VehicleId(1));

    assert_eq!(ctx.record(VehicleId(1)).unwrap().pending_countdown, 3);
    assert!(host.rotation_writes.is_empty());
}

#[test]
fn test_autopilot_with_momentum_still_schedules() {
    let (mut ctx, mut host) = spinning_setup();
    let autopilot = EngagedAutopilot;
    let addons = Addons {
        autopilot: Some(&autopilot),
        remote_link: None,
    };

    ctx.on_leave_packed(&mut host, &addons, VehicleId(1));

    let record = ctx.record(VehicleId(1)).unwrap();
    assert_eq!(record.pending_countdown, 3);
    assert_eq!(record.pending_reapply_momentum, Vector3::new(0.0, 0.2, 0.0));
    assert!(host.rotation_writes.is_empty(), "no relative snap");

    for _ in 0..3 {
        ctx.tick(&mut host, &addons);
    }
    assert_eq!(host.torque_impulses.len(), 2);
}

#[test]
fn test_zero_inertia_component_does_not_blow_up() {
    let (mut ctx, mut host) = spinning_setup();
    ctx.record_mut(VehicleId(1)).stored_inertia_diag = Vector3::new(0.0, 1.0, 0.0);

    ctx.on_leave_packed(&mut host, &Addons::default(), VehicleId(1));
    for _ in 0..3 {
        tick(&mut ctx, &mut host);
    }

    assert!(!host.torque_impulses.is_empty());
    for (_, impulse) in &host.torque_impulses {
        assert!(impulse.iter().all(|c| c.is_finite()));
        assert_relative_eq!(*impulse, Vector3::new(0.0, 0.0, 0.2), epsilon = 1e-12);
    }
}

#[test]
fn test_parts_without_rigid_body_are_skipped() {
    let (mut ctx, mut host) = spinning_setup();
    host.vehicles.get_mut(&VehicleId(1)).unwrap().parts[1].has_rigid_body = false;

    ctx.on_leave_packed(&mut host, &Addons::default(), VehicleId(1));
    for _ in 0..3 {
        tick(&mut ctx, &mut host);
    }

    assert_eq!(host.torque_impulses.len(), 1);
    assert_eq!(host.torque_impulses[0].0, PartId(10));
    assert!(!ctx.clamps().is_relaxed(PartId(11)));
}

#[test]
fn test_clamps_relaxed_for_ten_ticks() {
    let (mut ctx, mut host) = spinning_setup();

    ctx.on_leave_packed(&mut host, &Addons::default(), VehicleId(1));
    for _ in 0..3 {
        tick(&mut ctx, &mut host);
    }
    assert_eq!(host.clamps[&PartId(10)], 500.0);
    assert!(ctx.clamps().is_relaxed(PartId(10)));

    // The reapplication tick counted as the first of ten.
    for _ in 0..8 {
        tick(&mut ctx, &mut host);
    }
    assert_eq!(host.clamps[&PartId(10)], 500.0);

    tick(&mut ctx, &mut host);
    assert_eq!(host.clamps[&PartId(10)], 50.0);
    assert_eq!(host.clamps[&PartId(11)], 50.0);
    assert!(ctx.clamps().is_empty());
}

#[test]
fn test_failed_clamp_restore_is_dropped() {
    let (mut ctx, mut host) = spinning_setup();

    ctx.on_leave_packed(&mut host, &Addons::default(), VehicleId(1));
    for _ in 0..3 {
        tick(&mut ctx, &mut host);
    }
    host.failing_clamps.insert(PartId(10));

    for _ in 0..9 {
        tick(&mut ctx, &mut host);
    }

    assert!(ctx.clamps().is_empty());
    assert_eq!(host.clamps[&PartId(10)], 500.0);
    assert_eq!(host.clamps[&PartId(11)], 50.0);
}

#[test]
fn test_repacking_cancels_pending_reapply() {
    let (mut ctx, mut host) = spinning_setup();

    ctx.on_leave_packed(&mut host, &Addons::default(), VehicleId(1));
    tick(&mut ctx, &mut host);

    host.state_mut(1).packed = true;
    host.state_mut(1).inertia_diagonal = Vector3::new(3.0, 4.0, 5.0);
    ctx.on_enter_packed(&host, VehicleId(1));

    let record = ctx.record(VehicleId(1)).unwrap();
    assert_eq!(record.pending_countdown, -1);
    assert_eq!(record.stored_inertia_diag, Vector3::new(3.0, 4.0, 5.0));

    for _ in 0..5 {
        tick(&mut ctx, &mut host);
    }
    assert!(host.torque_impulses.is_empty());
}

#[test]
fn test_relative_hold_at_rest_snaps_to_reference() {
    let mut host = MockHost::new().with_vehicle(1, flying_state(), vec![part(10, Vector3::zeros())]);
    host.bodies.insert(BodyId(2), Vector3::new(0.0, 10.0, 0.0));
    let mut ctx = context();
    {
        let record = ctx.record_mut(VehicleId(1));
        record.reference = Some(ObjectId::Body(BodyId(2)));
        // Snapshot taken while the reference sat on +x.
        record.direction = Vector3::x();
        record.rotation = UnitQuaternion::identity();
        record.frame_reference_axis = Vector3::x();
    }

    ctx.on_leave_packed(&mut host, &Addons::default(), VehicleId(1));

    let quarter = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
    assert_relative_eq!(host.state(1).rotation, quarter, epsilon = 1e-12);
    assert_relative_eq!(host.state(1).hold_heading, quarter, epsilon = 1e-12);
    assert_eq!(ctx.record(VehicleId(1)).unwrap().pending_countdown, -1);
}

#[test]
fn test_snap_compensates_frame_drift() {
    let mut host = MockHost::new().with_vehicle(1, flying_state(), vec![]);
    host.bodies.insert(BodyId(2), Vector3::new(0.0, 10.0, 0.0));
    // The global frame turned a quarter about z while packed.
    host.frame_axis = Vector3::y();
    let mut ctx = context();
    {
        let record = ctx.record_mut(VehicleId(1));
        record.reference = Some(ObjectId::Body(BodyId(2)));
        record.direction = Vector3::x();
        record.frame_reference_axis = Vector3::x();
    }

    ctx.on_leave_packed(&mut host, &Addons::default(), VehicleId(1));

    // The drift alone already lines the snapshot up with the reference.
    assert_relative_eq!(host.state(1).forward, Vector3::y(), epsilon = 1e-12);
}

#[test]
fn test_grounded_vehicle_is_left_alone() {
    let (mut ctx, mut host) = spinning_setup();
    host.state_mut(1).situation = Situation::Splashed;

    ctx.on_leave_packed(&mut host, &Addons::default(), VehicleId(1));

    assert_eq!(ctx.record(VehicleId(1)).unwrap().pending_countdown, -1);
    assert!(host.rotation_writes.is_empty());
}

struct BusyLink;

impl RemoteLinkAddon for BusyLink {
    fn is_controllable(&self, _id: VehicleId) -> bool {
        true
    }

    fn flight_mode(&self, _id: VehicleId) -> RemoteFlightMode {
        RemoteFlightMode::AttitudeHold
    }
}

#[test]
fn test_absolute_mode_at_rest_does_nothing() {
    let mut host = MockHost::new().with_vehicle(1, flying_state(), vec![part(10, Vector3::zeros())]);
    let mut ctx = context();
    let link = BusyLink;
    let addons = Addons {
        autopilot: None,
        remote_link: Some(&link),
    };

    ctx.on_leave_packed(&mut host, &addons, VehicleId(1));

    assert_eq!(ctx.record(VehicleId(1)).unwrap().pending_countdown, -1);
    assert!(host.rotation_writes.is_empty());
}

#[test]
fn test_absolute_mode_still_restores_spin() {
    let (mut ctx, mut host) = spinning_setup();
    let link = BusyLink;
    let addons = Addons {
        autopilot: None,
        remote_link: Some(&link),
    };

    ctx.on_leave_packed(&mut host, &addons, VehicleId(1));

    assert_eq!(ctx.record(VehicleId(1)).unwrap().pending_countdown, 3);
}
