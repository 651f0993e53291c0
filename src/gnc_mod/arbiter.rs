//! SAS/RCS arbitration.
//!
//! Channel A is the continuous, propellant-free path (reaction wheels, with
//! the host's SAS holding attitude once settled). Channel B is RCS: high
//! authority, but it burns monopropellant. With conservation on, RCS is only
//! requested for large errors and SAS takes over after the error has stayed
//! small for a full debounce window.

use std::fmt;

use tracing::debug;

use super::steering::SteeringError;
use crate::config::{ArbiterThresholds, AttitudeConfig};
use crate::vessel::PilotInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArbiterMode {
    #[default]
    Idle,
    /// Channel A only: RCS released, SAS holds if the operator allows it.
    ChannelA,
    /// Channel B engaged for rotation.
    ChannelB,
    /// Operator is flying at least one axis group.
    ManualOverride,
}

impl fmt::Display for ArbiterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArbiterMode::Idle => "idle",
            ArbiterMode::ChannelA => "channel A",
            ArbiterMode::ChannelB => "channel B",
            ArbiterMode::ManualOverride => "manual",
        };
        f.write_str(s)
    }
}

/// Axis groups the operator is commanding this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualInput {
    pub pitch_yaw: bool,
    pub roll: bool,
}

impl ManualInput {
    pub fn any(&self) -> bool {
        self.pitch_yaw || self.roll
    }
}

/// What the attitude controller must do after arbitration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArbiterDecision {
    pub reset_pid: bool,
    pub manual: ManualInput,
}

#[derive(Debug, Clone)]
pub struct ActuatorArbiter {
    thresholds: ArbiterThresholds,
    deadband: f64,
    mode: ArbiterMode,
    settle_counter: u32,
    /// Resource conservation (auto RCS).
    conserve_fuel: bool,
    /// Operator permissions for each channel.
    sas_permitted: bool,
    rcs_permitted: bool,
    /// Current requests.
    sas_engaged: bool,
    rcs_engaged: bool,
    /// Cleared while another controller owns RCS for translation.
    rcs_rotation_authority: bool,
    /// Channel states last pushed to the host.
    host_sas: bool,
    host_rcs: bool,
}

impl ActuatorArbiter {
    pub fn new(config: &AttitudeConfig) -> Self {
        Self {
            thresholds: config.thresholds,
            deadband: config.manual_deadband,
            mode: ArbiterMode::Idle,
            settle_counter: 0,
            conserve_fuel: config.conserve_fuel,
            sas_permitted: false,
            rcs_permitted: false,
            sas_engaged: false,
            rcs_engaged: false,
            rcs_rotation_authority: true,
            host_sas: false,
            host_rcs: false,
        }
    }

    pub fn configure(&mut self, config: &AttitudeConfig) {
        self.thresholds = config.thresholds;
        self.deadband = config.manual_deadband;
        self.conserve_fuel = config.conserve_fuel;
    }

    /// Take the operator's current channel toggles as permissions. Both
    /// channels start released; the autopilot steers until settled.
    pub fn on_enable(&mut self, pilot: &PilotInput) {
        self.sas_permitted = pilot.sas;
        self.rcs_permitted = pilot.rcs;
        self.sas_engaged = false;
        self.rcs_engaged = false;
        self.host_sas = pilot.sas;
        self.host_rcs = pilot.rcs;
        self.settle_counter = 0;
        self.mode = ArbiterMode::Idle;
    }

    /// Release RCS and restore the operator's SAS choice.
    pub fn on_disable(&mut self) {
        self.rcs_engaged = false;
        self.sas_engaged = self.sas_permitted;
        self.settle_counter = 0;
        self.mode = ArbiterMode::Idle;
    }

    // -----------------------------------------------------------------------
    // Operator observation
    // -----------------------------------------------------------------------

    /// Detect operator toggles of SAS/RCS against what was last commanded.
    pub fn observe_operator(&mut self, pilot: &PilotInput) {
        if pilot.sas != self.host_sas {
            self.sas_permitted = !self.sas_permitted;
            self.sas_engaged = pilot.sas;
            self.host_sas = pilot.sas;
            debug!(permitted = self.sas_permitted, "operator toggled SAS");
        }
        if pilot.rcs != self.host_rcs {
            if !self.host_rcs && self.rcs_permitted {
                // operator forced RCS on: stop economizing
                self.conserve_fuel = false;
            } else {
                self.rcs_permitted = !self.rcs_permitted;
                self.conserve_fuel = true;
            }
            self.host_rcs = pilot.rcs;
            debug!(permitted = self.rcs_permitted, conserve = self.conserve_fuel, "operator toggled RCS");
        }
    }

    /// Axis groups whose stick deviates from trim by more than the deadband.
    pub fn detect_manual(&self, pilot: &PilotInput) -> ManualInput {
        let off = |value: f64, trim: f64| (value - trim).abs() > self.deadband;
        ManualInput {
            pitch_yaw: off(pilot.pitch, pilot.pitch_trim) || off(pilot.yaw, pilot.yaw_trim),
            roll: off(pilot.roll, pilot.roll_trim),
        }
    }

    /// Record the channel states that were actually sent to the host.
    pub fn commit(&mut self, sas: bool, rcs: bool) {
        self.host_sas = sas;
        self.host_rcs = rcs;
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    pub fn update(&mut self, error: &SteeringError, manual: ManualInput) -> ArbiterDecision {
        let previous = self.mode;

        if manual.any() {
            self.settle_counter = 0;
            self.mode = ArbiterMode::ManualOverride;
            self.log_transition(previous);
            return ArbiterDecision { reset_pid: true, manual };
        }

        if !self.conserve_fuel {
            self.rcs_engaged = self.rcs_rotation_authority;
            self.sas_engaged = false;
            self.mode = if self.rcs_engaged { ArbiterMode::ChannelB } else { ArbiterMode::Idle };
            self.log_transition(previous);
            return ArbiterDecision::default();
        }

        let t = &self.thresholds;
        let settled = error.abs_rad.iter().all(|e| *e < t.settle);
        let coarse = error.abs_rad.iter().any(|e| *e > t.coarse);
        let severe = error.abs_rad.iter().any(|e| *e > t.severe);

        if settled && self.settle_counter < t.settle_ticks {
            self.settle_counter += 1;
        }

        let mut reset_pid = false;
        if coarse {
            self.settle_counter = 0;
            if severe {
                self.rcs_engaged = self.rcs_permitted && self.rcs_rotation_authority;
            }
            self.sas_engaged = false;
            self.mode = if self.rcs_engaged { ArbiterMode::ChannelB } else { ArbiterMode::Idle };
        } else if self.settle_counter >= t.settle_ticks {
            self.rcs_engaged = false;
            self.sas_engaged = self.sas_permitted;
            reset_pid = self.sas_engaged;
            self.mode = ArbiterMode::ChannelA;
        } else if self.mode == ArbiterMode::ManualOverride {
            self.mode = if self.rcs_engaged { ArbiterMode::ChannelB } else { ArbiterMode::Idle };
        }

        self.log_transition(previous);
        ArbiterDecision { reset_pid, manual }
    }

    fn log_transition(&self, previous: ArbiterMode) {
        if previous != self.mode {
            debug!(from = %previous, to = %self.mode, counter = self.settle_counter, "arbiter mode");
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn mode(&self) -> ArbiterMode {
        self.mode
    }

    pub fn settle_counter(&self) -> u32 {
        self.settle_counter
    }

    pub fn sas_engaged(&self) -> bool {
        self.sas_engaged
    }

    pub fn rcs_engaged(&self) -> bool {
        self.rcs_engaged
    }

    pub fn conserve_fuel(&self) -> bool {
        self.conserve_fuel
    }

    pub fn set_conserve_fuel(&mut self, on: bool) {
        self.conserve_fuel = on;
    }

    pub fn sas_permitted(&self) -> bool {
        self.sas_permitted
    }

    pub fn rcs_permitted(&self) -> bool {
        self.rcs_permitted
    }

    pub fn set_permissions(&mut self, sas: bool, rcs: bool) {
        self.sas_permitted = sas;
        self.rcs_permitted = rcs;
    }

    pub fn rcs_rotation_authority(&self) -> bool {
        self.rcs_rotation_authority
    }

    pub fn set_rcs_rotation_authority(&mut self, on: bool) {
        self.rcs_rotation_authority = on;
        if !on {
            self.rcs_engaged = false;
        }
    }

    /// Short advisory status for display.
    pub fn status(&self) -> String {
        match self.mode {
            ArbiterMode::ManualOverride => "Manual override".to_string(),
            ArbiterMode::ChannelA if self.sas_engaged => "SAS holding, RCS off".to_string(),
            ArbiterMode::ChannelA => "Reaction wheels only".to_string(),
            ArbiterMode::ChannelB if !self.conserve_fuel => "RCS always on".to_string(),
            ArbiterMode::ChannelB => "RCS assist".to_string(),
            ArbiterMode::Idle if self.settle_counter > 0 => format!(
                "Settling {}/{}",
                self.settle_counter, self.thresholds.settle_ticks
            ),
            ArbiterMode::Idle => "Steering".to_string(),
        }
    }
}
