//! Deciding which rotation policy applies to a vehicle this tick.

use crate::{HoldMode, VehicleId, VehicleState};

/// The policy a vehicle is under for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Off,
    /// Some controller owns the attitude; only momentum is preserved.
    Absolute,
    Autopilot,
    /// Hold attitude relative to a reference object.
    Relative,
    Prograde,
    Retrograde,
    Normal,
    AntiNormal,
    RadialOut,
    RadialIn,
}

impl ControlMode {
    /// Holds that point the vehicle along its velocity or radial vector.
    pub fn is_directional(self) -> bool {
        matches!(
            self,
            ControlMode::Prograde
                | ControlMode::Retrograde
                | ControlMode::RadialIn
                | ControlMode::RadialOut
        )
    }
}

/// Target reported by an autopilot add-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutopilotTarget {
    #[default]
    Off,
    Orbital,
    Surface,
    Target,
    Maneuver,
    Custom,
}

/// Flight mode reported by a remote-link add-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteFlightMode {
    #[default]
    Off,
    AttitudeHold,
    AltitudeHold,
    Custom,
}

pub trait AutopilotAddon {
    /// Whether the autopilot is driving the vehicle right now.
    fn is_active(&self, id: VehicleId) -> bool;

    fn target(&self, id: VehicleId) -> AutopilotTarget;
}

pub trait RemoteLinkAddon {
    fn is_controllable(&self, id: VehicleId) -> bool;

    fn flight_mode(&self, id: VehicleId) -> RemoteFlightMode;
}

/// The add-ons installed alongside the host. Either may be absent.
#[derive(Clone, Copy, Default)]
pub struct Addons<'a> {
    pub autopilot: Option<&'a dyn AutopilotAddon>,
    pub remote_link: Option<&'a dyn RemoteLinkAddon>,
}

/// Add-on answers for one vehicle, queried once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalModes {
    pub link_controllable: bool,
    pub link_mode: RemoteFlightMode,
    pub autopilot_active: bool,
    pub autopilot_target: AutopilotTarget,
}

impl Default for ExternalModes {
    fn default() -> Self {
        Self {
            link_controllable: true,
            link_mode: RemoteFlightMode::Off,
            autopilot_active: false,
            autopilot_target: AutopilotTarget::Off,
        }
    }
}

impl ExternalModes {
    pub fn query(addons: &Addons<'_>, id: VehicleId) -> Self {
        let mut modes = Self::default();
        if let Some(link) = addons.remote_link {
            modes.link_controllable = link.is_controllable(id);
            modes.link_mode = link.flight_mode(id);
        }
        if let Some(autopilot) = addons.autopilot {
            modes.autopilot_active = autopilot.is_active(id);
            modes.autopilot_target = autopilot.target(id);
        }
        modes
    }
}

/// The host-side inputs to [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStatus {
    pub controllable: bool,
    pub hold_enabled: bool,
    pub hold_mode: HoldMode,
}

impl From<&VehicleState> for ControlStatus {
    fn from(state: &VehicleState) -> Self {
        Self {
            controllable: state.controllable,
            hold_enabled: state.hold_enabled,
            hold_mode: state.hold_mode,
        }
    }
}

/// Map a vehicle's control situation onto a single mode. The first matching
/// rule wins.
pub fn classify(status: &ControlStatus, external: &ExternalModes) -> ControlMode {
    if !status.controllable || !external.link_controllable {
        return ControlMode::Off;
    }
    if external.link_mode != RemoteFlightMode::Off {
        return ControlMode::Absolute;
    }
    if external.autopilot_active {
        return ControlMode::Autopilot;
    }

    let target_set = external.autopilot_target != AutopilotTarget::Off;
    match (status.hold_enabled, target_set) {
        (true, false) => match status.hold_mode {
            HoldMode::StabilityAssist => ControlMode::Relative,
            HoldMode::Prograde => ControlMode::Prograde,
            HoldMode::Retrograde => ControlMode::Retrograde,
            HoldMode::Normal => ControlMode::Normal,
            HoldMode::AntiNormal => ControlMode::AntiNormal,
            HoldMode::RadialOut => ControlMode::RadialOut,
            HoldMode::RadialIn => ControlMode::RadialIn,
            HoldMode::Target | HoldMode::AntiTarget | HoldMode::Maneuver => ControlMode::Absolute,
        },
        (true, true) | (false, true) => ControlMode::Absolute,
        (false, false) => ControlMode::Off,
    }
}
