//! Rotation and angular momentum bookkeeping for vehicles that move between
//! analytic ("packed") and rigid-body ("unpacked") simulation.
//!
//! The host drives a [`RotationContext`]: one [`RotationContext::tick`] per
//! fixed physics step, plus the lifecycle handlers as vehicles are created,
//! destroyed, packed and unpacked. All host access goes through
//! [`PhysicsHost`].

extern crate nalgebra as na;

pub mod algebra;
mod config;
mod context;
mod error;
mod host;
mod mode;
pub mod packed;
pub mod persist;
mod record;
pub mod transition;
pub mod unpacked;

pub use algebra::rotation_between;
pub use config::RotationConfig;
pub use context::RotationContext;
pub use error::{HostError, RotationError};
pub use host::{
    BodyId, HoldMode, ObjectId, PartId, PartState, PhysicsHost, Situation, VehicleId,
    VehicleState,
};
pub use mode::{
    Addons, AutopilotAddon, AutopilotTarget, ControlMode, ControlStatus, ExternalModes,
    RemoteFlightMode, RemoteLinkAddon, classify,
};
pub use persist::{SavedState, SavedVehicle};
pub use record::{RecordStore, VehicleRecord};
pub use transition::ClampRelaxations;
