#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};

use nalgebra::{UnitQuaternion, Vector3};
use sim_rotation::{
    AutopilotAddon, AutopilotTarget, BodyId, HoldMode, HostError, ObjectId, PartId, PartState,
    PhysicsHost, Situation, VehicleId, VehicleState,
};

pub const PRIMARY: BodyId = BodyId(1);

/// A flying, controllable, unpacked vehicle at the origin with the built-in
/// hold in stability assist.
pub fn flying_state() -> VehicleState {
    VehicleState {
        packed: false,
        loaded: true,
        situation: Situation::Orbiting,
        controllable: true,
        hold_enabled: true,
        hold_mode: HoldMode::StabilityAssist,
        angular_velocity: Vector3::zeros(),
        angular_momentum: Vector3::zeros(),
        inertia_diagonal: Vector3::new(1.0, 1.0, 1.0),
        rotation: UnitQuaternion::identity(),
        position: Vector3::zeros(),
        reference_rotation: UnitQuaternion::identity(),
        reference_position: Vector3::zeros(),
        forward: Vector3::x(),
        orbital_velocity: Vector3::y(),
        primary_body: PRIMARY,
        hold_heading: UnitQuaternion::identity(),
        center_of_mass: Vector3::zeros(),
    }
}

pub fn part(id: u64, position: Vector3<f64>) -> PartState {
    PartState {
        id: PartId(id),
        position,
        mass: 1.0,
        has_rigid_body: true,
    }
}

/// An autopilot add-on flying every vehicle towards an orbital target.
pub struct EngagedAutopilot;

impl AutopilotAddon for EngagedAutopilot {
    fn is_active(&self, _id: VehicleId) -> bool {
        true
    }

    fn target(&self, _id: VehicleId) -> AutopilotTarget {
        AutopilotTarget::Orbital
    }
}

pub struct MockVehicle {
    pub state: VehicleState,
    pub parts: Vec<PartState>,
}

/// A scripted host that records every mutation.
pub struct MockHost {
    pub vehicles: BTreeMap<VehicleId, MockVehicle>,
    pub bodies: HashMap<BodyId, Vector3<f64>>,
    pub frame_axis: Vector3<f64>,
    pub warp: f64,
    pub dt: f64,
    pub clamps: HashMap<PartId, f64>,
    pub failing_clamps: HashSet<PartId>,
    pub torque_impulses: Vec<(PartId, Vector3<f64>)>,
    pub force_impulses: Vec<(PartId, Vector3<f64>)>,
    pub rotation_writes: Vec<(VehicleId, UnitQuaternion<f64>)>,
    pub rolls: HashMap<VehicleId, f64>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            vehicles: BTreeMap::new(),
            bodies: HashMap::from([(PRIMARY, Vector3::new(0.0, 0.0, -100.0))]),
            frame_axis: Vector3::x(),
            warp: 1.0,
            dt: 0.02,
            clamps: HashMap::new(),
            failing_clamps: HashSet::new(),
            torque_impulses: Vec::new(),
            force_impulses: Vec::new(),
            rotation_writes: Vec::new(),
            rolls: HashMap::new(),
        }
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vehicle(mut self, id: u64, state: VehicleState, parts: Vec<PartState>) -> Self {
        for part in &parts {
            self.clamps.insert(part.id, 50.0);
        }
        self.vehicles
            .insert(VehicleId(id), MockVehicle { state, parts });
        self
    }

    pub fn state(&self, id: u64) -> &VehicleState {
        &self.vehicles[&VehicleId(id)].state
    }

    pub fn state_mut(&mut self, id: u64) -> &mut VehicleState {
        &mut self
            .vehicles
            .get_mut(&VehicleId(id))
            .expect("unknown vehicle")
            .state
    }

    /// Move a vehicle, keeping its reference transform on its position.
    pub fn move_to(&mut self, id: u64, position: Vector3<f64>) {
        let state = self.state_mut(id);
        state.position = position;
        state.reference_position = position;
        state.center_of_mass = position;
    }
}

impl PhysicsHost for MockHost {
    fn vehicles(&self) -> Vec<VehicleId> {
        self.vehicles.keys().copied().collect()
    }

    fn vehicle(&self, id: VehicleId) -> Option<VehicleState> {
        self.vehicles.get(&id).map(|v| v.state.clone())
    }

    fn parts(&self, id: VehicleId) -> Vec<PartState> {
        self.vehicles
            .get(&id)
            .map(|v| v.parts.clone())
            .unwrap_or_default()
    }

    fn object_position(&self, object: ObjectId) -> Option<Vector3<f64>> {
        match object {
            ObjectId::Vehicle(id) => self.vehicles.get(&id).map(|v| v.state.reference_position),
            ObjectId::Body(id) => self.bodies.get(&id).copied(),
        }
    }

    fn frame_reference_axis(&self) -> Vector3<f64> {
        self.frame_axis
    }

    fn time_warp_rate(&self) -> f64 {
        self.warp
    }

    fn fixed_delta_time(&self) -> f64 {
        self.dt
    }

    fn max_angular_velocity(&self, part: PartId) -> Option<f64> {
        self.clamps.get(&part).copied()
    }

    fn set_rotation(&mut self, id: VehicleId, rotation: UnitQuaternion<f64>) {
        self.rotation_writes.push((id, rotation));
        if let Some(v) = self.vehicles.get_mut(&id) {
            v.state.rotation = rotation;
            v.state.reference_rotation = rotation;
            v.state.forward = rotation * Vector3::x();
        }
    }

    fn set_hold_heading(&mut self, id: VehicleId, heading: UnitQuaternion<f64>) {
        if let Some(v) = self.vehicles.get_mut(&id) {
            v.state.hold_heading = heading;
        }
    }

    fn set_roll(&mut self, id: VehicleId, roll: f64) {
        self.rolls.insert(id, roll);
    }

    fn add_torque_impulse(&mut self, part: PartId, impulse: Vector3<f64>) {
        self.torque_impulses.push((part, impulse));
    }

    fn add_force_impulse(&mut self, part: PartId, impulse: Vector3<f64>) {
        self.force_impulses.push((part, impulse));
    }

    fn set_max_angular_velocity(&mut self, part: PartId, value: f64) -> Result<(), HostError> {
        if self.failing_clamps.contains(&part) {
            return Err(HostError::Rejected("part is gone".into()));
        }
        match self.clamps.get_mut(&part) {
            Some(clamp) => {
                *clamp = value;
                Ok(())
            }
            None => Err(HostError::UnknownPart(part)),
        }
    }
}
