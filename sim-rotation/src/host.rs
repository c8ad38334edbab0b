//! The seam between the rotation bookkeeping and the simulation that owns the
//! vehicles.
//!
//! Everything is addressed by stable identifiers. The host decides object
//! lifetimes, so nothing here holds on to host data between calls.

use na::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::HostError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

/// A rigid sub-body of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartId(pub u64);

/// Anything a vehicle can hold its attitude relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectId {
    Vehicle(VehicleId),
    Body(BodyId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Situation {
    Landed,
    Splashed,
    PreLaunch,
    #[default]
    Flying,
    SubOrbital,
    Orbiting,
    Escaping,
}

impl Situation {
    /// Ground contact makes kinematic rotation meaningless.
    pub fn is_grounded(self) -> bool {
        matches!(
            self,
            Situation::Landed | Situation::Splashed | Situation::PreLaunch
        )
    }
}

/// Sub-modes of the host's built-in attitude hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HoldMode {
    #[default]
    StabilityAssist,
    Prograde,
    Retrograde,
    Normal,
    AntiNormal,
    RadialIn,
    RadialOut,
    Target,
    AntiTarget,
    Maneuver,
}

/// Read-only snapshot of one vehicle, taken once per use.
///
/// Angular velocity, momentum and inertia are expressed in the vehicle's
/// reference frame; positions and rotations are in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub packed: bool,
    pub loaded: bool,
    pub situation: Situation,
    pub controllable: bool,
    pub hold_enabled: bool,
    pub hold_mode: HoldMode,
    pub angular_velocity: Vector3<f64>,
    pub angular_momentum: Vector3<f64>,
    /// Zero once the rigid bodies have been torn down.
    pub inertia_diagonal: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub position: Vector3<f64>,
    pub reference_rotation: UnitQuaternion<f64>,
    pub reference_position: Vector3<f64>,
    /// World-space forward axis.
    pub forward: Vector3<f64>,
    pub orbital_velocity: Vector3<f64>,
    pub primary_body: BodyId,
    pub hold_heading: UnitQuaternion<f64>,
    pub center_of_mass: Vector3<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartState {
    pub id: PartId,
    pub position: Vector3<f64>,
    pub mass: f64,
    /// Whether the physics engine currently has a rigid body for this part.
    pub has_rigid_body: bool,
}

impl PartState {
    pub fn carries_mass(&self) -> bool {
        self.has_rigid_body && self.mass > 0.0
    }
}

/// Queries and mutations the host simulation provides.
pub trait PhysicsHost {
    /// Every live vehicle, in processing order.
    fn vehicles(&self) -> Vec<VehicleId>;

    fn vehicle(&self, id: VehicleId) -> Option<VehicleState>;

    fn parts(&self, id: VehicleId) -> Vec<PartState>;

    /// World position of a vehicle's reference transform or a body's center.
    fn object_position(&self, object: ObjectId) -> Option<Vector3<f64>>;

    /// The rotating reference axis of the global frame.
    fn frame_reference_axis(&self) -> Vector3<f64>;

    fn time_warp_rate(&self) -> f64;

    fn fixed_delta_time(&self) -> f64;

    fn max_angular_velocity(&self, part: PartId) -> Option<f64>;

    fn set_rotation(&mut self, id: VehicleId, rotation: UnitQuaternion<f64>);

    fn set_hold_heading(&mut self, id: VehicleId, heading: UnitQuaternion<f64>);

    fn set_roll(&mut self, id: VehicleId, roll: f64);

    /// Velocity-change torque impulse, world space.
    fn add_torque_impulse(&mut self, part: PartId, impulse: Vector3<f64>);

    /// Velocity-change linear impulse, world space.
    fn add_force_impulse(&mut self, part: PartId, impulse: Vector3<f64>);

    fn set_max_angular_velocity(&mut self, part: PartId, value: f64) -> Result<(), HostError>;
}
