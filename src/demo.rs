//! A small stand-in for the host physics engine.
//!
//! Vessels are single rigid bodies made of point-mass parts. Unpacked vessels
//! are integrated torque-free; packed ones are left entirely to the rotation
//! bookkeeping, which is the point of the demo.

use std::collections::BTreeMap;

use bevy::prelude::*;
use na::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use sim_rotation::algebra::{rate_from_momentum, rotation_about};
use sim_rotation::{
    BodyId, HoldMode, HostError, ObjectId, PartId, PartState, PhysicsHost, Situation, VehicleId,
    VehicleState,
};

/// Fixed physics rate of the demo, in Hz.
pub const FIXED_HZ: f64 = 50.0;

/// Body-axis roll acceleration at full roll input, rad/s².
const ROLL_AUTHORITY: f64 = 0.5;

/// Fraction of the remaining rate removed per second while the built-in hold
/// is engaged.
const HOLD_DAMPING: f64 = 2.0;

const INERTIA_FLOOR: f64 = 1e-6;

/// How hard the built-in hold pulls the orientation onto its heading.
const HOLD_GAIN: f64 = 0.2;

/// Attitude of a rigid vessel.
#[derive(Debug, Clone)]
pub struct Attitude {
    /// Orientation: body -> world
    pub q_bw: UnitQuaternion<f64>,
    /// Angular momentum in BODY frame
    pub lb: Vector3<f64>,
    /// Principal inertia in body frame.
    pub i_body: Vector3<f64>,
}

impl Attitude {
    pub fn omega_b(&self) -> Vector3<f64> {
        rate_from_momentum(&self.lb, &self.i_body, INERTIA_FLOOR)
    }

    /// Torque-free drift/kick step.
    pub fn step(&mut self, dt: f64) {
        let omega_b = self.omega_b();

        // --- DRIFT: Update orientation ---
        let theta = dt * omega_b.norm();
        self.q_bw *= rotation_about(&omega_b, theta);

        // --- KICK: Gyroscopic term only, no external torque ---
        self.lb += self.lb.cross(&omega_b) * dt;
    }
}

#[derive(Debug, Clone)]
pub struct DemoPart {
    pub id: PartId,
    /// Offset from the vessel origin, body frame.
    pub offset: Vector3<f64>,
    pub mass: f64,
    pub rigid: bool,
    pub max_angular_velocity: f64,
    torque_impulse: Vector3<f64>,
    force_impulse: Vector3<f64>,
}

#[derive(Debug, Clone)]
pub struct DemoVessel {
    pub attitude: Attitude,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub parts: Vec<DemoPart>,
    pub packed: bool,
    pub situation: Situation,
    pub hold_enabled: bool,
    pub hold_mode: HoldMode,
    pub hold_heading: UnitQuaternion<f64>,
    pub roll: f64,
    pub primary_body: BodyId,
    pack_requested: bool,
}

impl DemoVessel {
    fn center_of_mass(&self) -> Vector3<f64> {
        let mass: f64 = self.parts.iter().map(|p| p.mass).sum();
        if mass <= 0.0 {
            return self.position;
        }
        self.parts
            .iter()
            .map(|p| self.part_position(p) * p.mass)
            .sum::<Vector3<f64>>()
            / mass
    }

    fn part_position(&self, part: &DemoPart) -> Vector3<f64> {
        self.position + self.attitude.q_bw * part.offset
    }

    /// Fold the impulses queued on the parts into the vessel's motion.
    fn absorb_impulses(&mut self) {
        let rigid_mass: f64 = self.parts.iter().filter(|p| p.rigid).map(|p| p.mass).sum();
        if rigid_mass <= 0.0 {
            return;
        }
        let mut d_omega_w = Vector3::zeros();
        let mut d_vel = Vector3::zeros();
        for part in self.parts.iter_mut().filter(|p| p.rigid) {
            d_omega_w += part.torque_impulse * part.mass;
            d_vel += part.force_impulse * part.mass;
            part.torque_impulse = Vector3::zeros();
            part.force_impulse = Vector3::zeros();
        }
        let d_omega_b = self.attitude.q_bw.inverse() * (d_omega_w / rigid_mass);
        self.attitude.lb += self.attitude.i_body.component_mul(&d_omega_b);
        self.velocity += d_vel / rigid_mass;
    }

    /// The engine's own angular velocity limiter.
    fn clamp_rate(&mut self) {
        let limit = self
            .parts
            .iter()
            .filter(|p| p.rigid)
            .map(|p| p.max_angular_velocity)
            .fold(f64::INFINITY, f64::min);
        let omega_b = self.attitude.omega_b();
        let rate = omega_b.norm();
        if rate > limit {
            self.attitude.lb = self.attitude.i_body.component_mul(&(omega_b * (limit / rate)));
        }
    }

    fn step(&mut self, dt: f64) {
        self.absorb_impulses();

        self.attitude.lb.x += self.attitude.i_body.x * self.roll * ROLL_AUTHORITY * dt;

        if self.hold_enabled {
            self.attitude.lb *= (1.0 - HOLD_DAMPING * dt).max(0.0);
            self.attitude.q_bw = self
                .attitude
                .q_bw
                .try_slerp(&self.hold_heading, HOLD_GAIN * dt, 1e-9)
                .unwrap_or(self.hold_heading);
        }

        self.clamp_rate();
        self.attitude.step(dt);
        self.position += self.velocity * dt;
    }
}

/// Initial description of a vessel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VesselSpec {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    /// Roll, pitch, yaw in radians.
    pub euler: Vector3<f64>,
    /// Body-frame angular velocity.
    pub angular_velocity: Vector3<f64>,
    pub inertia: Vector3<f64>,
    pub parts: Vec<PartSpec>,
    pub situation: Situation,
    pub hold_enabled: bool,
    pub hold_mode: HoldMode,
    pub max_angular_velocity: f64,
}

impl Default for VesselSpec {
    fn default() -> Self {
        Self {
            position: Vector3::new(7000.0, 0.0, 0.0),
            velocity: Vector3::new(0.0, 7.5, 0.0),
            euler: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            inertia: Vector3::new(2.0, 3.0, 3.0),
            parts: vec![
                PartSpec {
                    offset: Vector3::new(1.0, 0.0, 0.0),
                    mass: 1.0,
                },
                PartSpec {
                    offset: Vector3::new(-1.0, 0.0, 0.0),
                    mass: 1.0,
                },
            ],
            situation: Situation::Orbiting,
            hold_enabled: false,
            hold_mode: HoldMode::StabilityAssist,
            max_angular_velocity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartSpec {
    pub offset: Vector3<f64>,
    pub mass: f64,
}

/// The demo's physics world, exposed to the rotation bookkeeping as its host.
#[derive(Resource, Debug)]
pub struct DemoWorld {
    pub bodies: BTreeMap<BodyId, Vector3<f64>>,
    pub vessels: BTreeMap<VehicleId, DemoVessel>,
    /// Rotation rate of the global frame about z, rad/s.
    pub frame_rate: f64,
    pub frame_angle: f64,
    pub warp: f64,
    pub dt: f64,
    next_part: u64,
}

pub const PRIMARY: BodyId = BodyId(0);

impl Default for DemoWorld {
    fn default() -> Self {
        Self {
            bodies: BTreeMap::from([(PRIMARY, Vector3::zeros())]),
            vessels: BTreeMap::new(),
            frame_rate: 1e-4,
            frame_angle: 0.0,
            warp: 1.0,
            dt: 1.0 / FIXED_HZ,
            next_part: 1,
        }
    }
}

impl DemoWorld {
    pub fn spawn(&mut self, id: VehicleId, spec: &VesselSpec) {
        let parts = spec
            .parts
            .iter()
            .map(|p| {
                let id = PartId(self.next_part);
                self.next_part += 1;
                DemoPart {
                    id,
                    offset: p.offset,
                    mass: p.mass,
                    rigid: true,
                    max_angular_velocity: spec.max_angular_velocity,
                    torque_impulse: Vector3::zeros(),
                    force_impulse: Vector3::zeros(),
                }
            })
            .collect();
        let q_bw = UnitQuaternion::from_euler_angles(spec.euler.x, spec.euler.y, spec.euler.z);
        let vessel = DemoVessel {
            attitude: Attitude {
                q_bw,
                lb: spec.inertia.component_mul(&spec.angular_velocity),
                i_body: spec.inertia,
            },
            position: spec.position,
            velocity: spec.velocity,
            parts,
            packed: false,
            situation: spec.situation,
            hold_enabled: spec.hold_enabled,
            hold_mode: spec.hold_mode,
            hold_heading: q_bw,
            roll: 0.0,
            primary_body: PRIMARY,
            pack_requested: false,
        };
        self.vessels.insert(id, vessel);
    }

    pub fn despawn(&mut self, id: VehicleId) -> bool {
        self.vessels.remove(&id).is_some()
    }

    /// Packing happens at the end of the step, after the notification has
    /// been handled, so inertia is still readable when it is.
    pub fn request_pack(&mut self, id: VehicleId) -> bool {
        match self.vessels.get_mut(&id) {
            Some(vessel) => {
                vessel.pack_requested = true;
                true
            }
            None => false,
        }
    }

    /// Unpacking is immediate: the notification follows it.
    pub fn unpack(&mut self, id: VehicleId) -> bool {
        match self.vessels.get_mut(&id) {
            Some(vessel) => {
                vessel.packed = false;
                vessel.attitude.lb = Vector3::zeros();
                for part in &mut vessel.parts {
                    part.rigid = true;
                }
                true
            }
            None => false,
        }
    }

    pub fn step(&mut self) {
        let dt = self.dt;
        for vessel in self.vessels.values_mut() {
            if vessel.pack_requested {
                vessel.pack_requested = false;
                vessel.packed = true;
                for part in &mut vessel.parts {
                    part.rigid = false;
                }
            }
            if !vessel.packed {
                vessel.step(dt);
            }
        }
        self.frame_angle += self.frame_rate * dt * self.warp;
    }

    fn part_mut(&mut self, id: PartId) -> Option<&mut DemoPart> {
        self.vessels
            .values_mut()
            .flat_map(|v| v.parts.iter_mut())
            .find(|p| p.id == id)
    }

    fn part(&self, id: PartId) -> Option<&DemoPart> {
        self.vessels
            .values()
            .flat_map(|v| v.parts.iter())
            .find(|p| p.id == id)
    }
}

impl PhysicsHost for DemoWorld {
    fn vehicles(&self) -> Vec<VehicleId> {
        self.vessels.keys().copied().collect()
    }

    fn vehicle(&self, id: VehicleId) -> Option<VehicleState> {
        let vessel = self.vessels.get(&id)?;
        let attitude = &vessel.attitude;
        // Rigid-body quantities are gone while packed.
        let (omega_b, lb, inertia) = if vessel.packed {
            (Vector3::zeros(), Vector3::zeros(), Vector3::zeros())
        } else {
            (attitude.omega_b(), attitude.lb, attitude.i_body)
        };
        Some(VehicleState {
            packed: vessel.packed,
            loaded: true,
            situation: vessel.situation,
            controllable: true,
            hold_enabled: vessel.hold_enabled,
            hold_mode: vessel.hold_mode,
            angular_velocity: omega_b,
            angular_momentum: lb,
            inertia_diagonal: inertia,
            rotation: attitude.q_bw,
            position: vessel.position,
            reference_rotation: attitude.q_bw,
            reference_position: vessel.position,
            forward: attitude.q_bw * Vector3::x(),
            orbital_velocity: vessel.velocity,
            primary_body: vessel.primary_body,
            hold_heading: vessel.hold_heading,
            center_of_mass: vessel.center_of_mass(),
        })
    }

    fn parts(&self, id: VehicleId) -> Vec<PartState> {
        let Some(vessel) = self.vessels.get(&id) else {
            return Vec::new();
        };
        vessel
            .parts
            .iter()
            .map(|p| PartState {
                id: p.id,
                position: vessel.part_position(p),
                mass: p.mass,
                has_rigid_body: p.rigid,
            })
            .collect()
    }

    fn object_position(&self, object: ObjectId) -> Option<Vector3<f64>> {
        match object {
            ObjectId::Vehicle(id) => self.vessels.get(&id).map(|v| v.position),
            ObjectId::Body(id) => self.bodies.get(&id).copied(),
        }
    }

    fn frame_reference_axis(&self) -> Vector3<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.frame_angle) * Vector3::x()
    }

    fn time_warp_rate(&self) -> f64 {
        self.warp
    }

    fn fixed_delta_time(&self) -> f64 {
        self.dt
    }

    fn max_angular_velocity(&self, part: PartId) -> Option<f64> {
        self.part(part).map(|p| p.max_angular_velocity)
    }

    fn set_rotation(&mut self, id: VehicleId, rotation: UnitQuaternion<f64>) {
        if let Some(vessel) = self.vessels.get_mut(&id) {
            vessel.attitude.q_bw = rotation;
        }
    }

    fn set_hold_heading(&mut self, id: VehicleId, heading: UnitQuaternion<f64>) {
        if let Some(vessel) = self.vessels.get_mut(&id) {
            vessel.hold_heading = heading;
        }
    }

    fn set_roll(&mut self, id: VehicleId, roll: f64) {
        if let Some(vessel) = self.vessels.get_mut(&id) {
            vessel.roll = roll;
        }
    }

    fn add_torque_impulse(&mut self, part: PartId, impulse: Vector3<f64>) {
        if let Some(part) = self.part_mut(part) {
            part.torque_impulse += impulse;
        }
    }

    fn add_force_impulse(&mut self, part: PartId, impulse: Vector3<f64>) {
        if let Some(part) = self.part_mut(part) {
            part.force_impulse += impulse;
        }
    }

    fn set_max_angular_velocity(&mut self, part: PartId, value: f64) -> Result<(), HostError> {
        let part = self.part_mut(part).ok_or(HostError::UnknownPart(part))?;
        if !part.rigid {
            return Err(HostError::Rejected(format!("{:?} has no rigid body", part.id)));
        }
        part.max_angular_velocity = value;
        Ok(())
    }
}
