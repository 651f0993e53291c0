//! Operator-editable settings.
//!
//! Everything here is `serde`-friendly so a host can persist it as JSON; the
//! core itself never touches the filesystem except through
//! [`AutopilotConfig::from_json_file`].

use std::f64::consts::SQRT_2;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AutopilotError, Result};

/// Smallest accepted steering time constant, s.
pub const MIN_TIME_CONSTANT: f64 = 0.01;

/// Smallest accepted command clamp, fraction of full deflection.
pub const MIN_OUTPUT_LIMIT: f64 = 0.01;

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    pub attitude: AttitudeConfig,
    pub rcs: RcsConfig,
    pub docking: DockingConfig,
}

impl AutopilotConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut config: AutopilotConfig = serde_json::from_str(json)?;
        config.validate()?;
        config.sanitize();
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that cannot be repaired by clamping.
    pub fn validate(&self) -> Result<()> {
        let a = &self.attitude;
        let numbers = [
            a.time_constant,
            a.manual_deadband,
            a.drive_limit,
            a.thresholds.settle,
            a.thresholds.coarse,
            a.thresholds.severe,
            self.rcs.kp,
            self.rcs.ki,
            self.rcs.kd,
            self.rcs.limit,
            self.docking.speed_limit,
            self.docking.approach_speed_mult,
            self.docking.terminal_distance,
        ];
        if numbers.iter().any(|v| v.is_nan()) {
            return Err(AutopilotError::Config("NaN setting".into()));
        }
        let t = &a.thresholds;
        if !(t.settle <= t.coarse && t.coarse <= t.severe) {
            return Err(AutopilotError::Config(format!(
                "arbiter thresholds must be ordered settle <= coarse <= severe, got {} / {} / {}",
                t.settle, t.coarse, t.severe
            )));
        }
        if t.settle_ticks == 0 {
            return Err(AutopilotError::Config("settle_ticks must be at least 1".into()));
        }
        Ok(())
    }

    /// Clamp recoverable out-of-range values in place.
    pub fn sanitize(&mut self) {
        self.attitude.time_constant = clamp_time_constant(self.attitude.time_constant);
        if !(0.0..=1.0).contains(&self.attitude.manual_deadband) {
            warn!(deadband = self.attitude.manual_deadband, "manual deadband clamped to [0, 1]");
            self.attitude.manual_deadband = self.attitude.manual_deadband.clamp(0.0, 1.0);
        }
        self.attitude.drive_limit = clamp_limit(self.attitude.drive_limit);
        self.rcs.limit = clamp_limit(self.rcs.limit);
        if self.docking.speed_limit < 0.0 {
            warn!(limit = self.docking.speed_limit, "negative docking speed limit, using 0 (unlimited)");
            self.docking.speed_limit = 0.0;
        }
    }
}

/// Clamp a steering time constant to the accepted minimum.
pub fn clamp_time_constant(tf: f64) -> f64 {
    if tf.is_nan() || tf < MIN_TIME_CONSTANT {
        warn!(tf, min = MIN_TIME_CONSTANT, "time constant out of range, clamped");
        MIN_TIME_CONSTANT
    } else {
        tf
    }
}

/// Clamp a symmetric command limit to `(0, 1]`. NaN falls back to full
/// deflection.
pub fn clamp_limit(limit: f64) -> f64 {
    if limit.is_nan() {
        warn!(limit, "NaN output limit, using 1");
        1.0
    } else if limit < MIN_OUTPUT_LIMIT || limit > 1.0 {
        warn!(limit, "output limit clamped to (0, 1]");
        limit.clamp(MIN_OUTPUT_LIMIT, 1.0)
    } else {
        limit
    }
}

// ---------------------------------------------------------------------------
// Attitude
// ---------------------------------------------------------------------------

/// How PID gains follow from the time constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainProfile {
    /// Kd = 0.6/Tf, Kp = 1/(8*sqrt2*Tf^2), Ki = Kp/(4*sqrt2*Tf).
    #[default]
    Classic,
    /// Kd = 0.53/Tf, Kp = Kd/(3*sqrt2*Tf), Ki = Kp/(12*sqrt2*Tf).
    Revised,
}

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl GainProfile {
    pub fn gains(self, tf: f64) -> Gains {
        let tf = tf.max(MIN_TIME_CONSTANT);
        match self {
            GainProfile::Classic => {
                let kd = 0.6 / tf;
                let kp = 1.0 / (8.0 * SQRT_2 * tf * tf);
                let ki = kp / (4.0 * SQRT_2 * tf);
                Gains { kp, ki, kd }
            }
            GainProfile::Revised => {
                let kd = 0.53 / tf;
                let kp = kd / (3.0 * SQRT_2 * tf);
                let ki = kp / (12.0 * SQRT_2 * tf);
                Gains { kp, ki, kd }
            }
        }
    }
}

/// Error thresholds (radians, per axis) and debounce length for the
/// SAS/RCS arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArbiterThresholds {
    /// Below this on every axis counts as settled.
    pub settle: f64,
    /// Above this on any axis resets the debounce counter and drops SAS.
    pub coarse: f64,
    /// Above this on any axis escalates to RCS.
    pub severe: f64,
    /// Consecutive settled ticks before handing over to SAS.
    pub settle_ticks: u32,
}

impl ArbiterThresholds {
    pub const fn radian_preset() -> Self {
        Self { settle: 0.005, coarse: 0.02, severe: 0.05, settle_ticks: 50 }
    }

    /// The degree-based threshold set: 0.4 / 1.0 / 3.0 degrees.
    pub fn degree_preset() -> Self {
        Self::from_degrees(0.4, 1.0, 3.0, 50)
    }

    pub fn from_degrees(settle: f64, coarse: f64, severe: f64, settle_ticks: u32) -> Self {
        Self {
            settle: settle.to_radians(),
            coarse: coarse.to_radians(),
            severe: severe.to_radians(),
            settle_ticks,
        }
    }
}

impl Default for ArbiterThresholds {
    fn default() -> Self {
        Self::radian_preset()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttitudeConfig {
    /// Steering time constant Tf, s. Output filter cutoff is 1/Tf.
    pub time_constant: f64,
    pub gain_profile: GainProfile,
    /// Use the measured body rate for the derivative term.
    pub derivative_on_measurement: bool,
    /// Subtract the stopping angle implied by current angular momentum.
    pub momentum_anticipation: bool,
    /// Prefer SAS over RCS once settled.
    pub conserve_fuel: bool,
    /// On manual input, hold the attitude the operator leaves the vessel in.
    pub kill_rotation_on_manual: bool,
    /// Deviation from trim that counts as manual input.
    pub manual_deadband: f64,
    /// Command clamp, fraction of full deflection.
    pub drive_limit: f64,
    pub thresholds: ArbiterThresholds,
}

impl Default for AttitudeConfig {
    fn default() -> Self {
        Self {
            time_constant: 0.2,
            gain_profile: GainProfile::Classic,
            derivative_on_measurement: false,
            momentum_anticipation: true,
            conserve_fuel: true,
            kill_rotation_on_manual: false,
            manual_deadband: 0.1,
            drive_limit: 1.0,
            thresholds: ArbiterThresholds::default(),
        }
    }
}

impl AttitudeConfig {
    pub fn gains(&self) -> Gains {
        self.gain_profile.gains(self.time_constant)
    }
}

// ---------------------------------------------------------------------------
// Translation (RCS velocity matching)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcsConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Translation command clamp.
    pub limit: f64,
}

impl Default for RcsConfig {
    fn default() -> Self {
        Self { kp: 2.0, ki: 0.0, kd: 0.0, limit: 1.0 }
    }
}

impl RcsConfig {
    pub fn gains(&self) -> Gains {
        Gains { kp: self.kp, ki: self.ki, kd: self.kd }
    }
}

// ---------------------------------------------------------------------------
// Docking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockingConfig {
    /// Cap on every commanded approach speed, m/s. Zero disables the cap.
    pub speed_limit: f64,
    /// Approach speed scales with this fraction of available RCS acceleration.
    pub approach_speed_mult: f64,
    /// Fixed roll about the docking axis, degrees. `None` leaves roll free.
    pub roll_lock: Option<f64>,
    /// Axial separation below which control is handed back, m.
    pub terminal_distance: f64,
    /// Lateral clearance needed to back past the target safely, m.
    pub backing_clearance: f64,
    /// Lateral offset that still counts as on-axis, m.
    pub off_axis_tolerance: f64,
}

impl Default for DockingConfig {
    fn default() -> Self {
        Self {
            speed_limit: 0.5,
            approach_speed_mult: 0.2,
            roll_lock: None,
            terminal_distance: 0.4,
            backing_clearance: 10.0,
            off_axis_tolerance: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn classic_gains_at_default_tf() {
        let g = GainProfile::Classic.gains(0.2);
        assert_relative_eq!(g.kd, 3.0, epsilon = 1e-12);
        assert_relative_eq!(g.kp, 1.0 / (8.0 * SQRT_2 * 0.04), epsilon = 1e-12);
        assert_relative_eq!(g.ki, g.kp / (4.0 * SQRT_2 * 0.2), epsilon = 1e-12);
    }

    #[test]
    fn revised_gains_chain() {
        let g = GainProfile::Revised.gains(0.5);
        assert_relative_eq!(g.kd, 1.06, epsilon = 1e-12);
        assert_relative_eq!(g.kp, g.kd / (3.0 * SQRT_2 * 0.5), epsilon = 1e-12);
    }

    #[test]
    fn time_constant_clamped() {
        assert_eq!(clamp_time_constant(0.0), MIN_TIME_CONSTANT);
        assert_eq!(clamp_time_constant(-3.0), MIN_TIME_CONSTANT);
        assert_eq!(clamp_time_constant(0.3), 0.3);
    }

    #[test]
    fn output_limits_clamped() {
        assert_eq!(clamp_limit(-1.0), MIN_OUTPUT_LIMIT);
        assert_eq!(clamp_limit(0.0), MIN_OUTPUT_LIMIT);
        assert_eq!(clamp_limit(3.0), 1.0);
        assert_eq!(clamp_limit(f64::NAN), 1.0);
        assert_eq!(clamp_limit(0.4), 0.4);
    }

    #[test]
    fn negative_rcs_limit_sanitized_on_load() {
        let cfg = AutopilotConfig::from_json_str(r#"{ "rcs": { "limit": -1.0 }, "attitude": { "drive_limit": -0.5 } }"#)
            .unwrap();
        assert_eq!(cfg.rcs.limit, MIN_OUTPUT_LIMIT);
        assert_eq!(cfg.attitude.drive_limit, MIN_OUTPUT_LIMIT);
    }

    #[test]
    fn nan_rcs_limit_rejected() {
        let mut cfg = AutopilotConfig::default();
        cfg.rcs.limit = f64::NAN;
        assert!(matches!(cfg.validate(), Err(AutopilotError::Config(_))));
    }

    #[test]
    fn json_roundtrip_with_defaults() {
        let cfg = AutopilotConfig::from_json_str(r#"{ "attitude": { "time_constant": 0.0 } }"#).unwrap();
        assert_eq!(cfg.attitude.time_constant, MIN_TIME_CONSTANT);
        assert_eq!(cfg.docking, DockingConfig::default());
        let text = cfg.to_json_string().unwrap();
        assert_eq!(AutopilotConfig::from_json_str(&text).unwrap(), cfg);
    }

    #[test]
    fn unordered_thresholds_rejected() {
        let mut cfg = AutopilotConfig::default();
        cfg.attitude.thresholds.settle = 0.1;
        assert!(matches!(cfg.validate(), Err(AutopilotError::Config(_))));
    }

    #[test]
    fn degree_preset_in_radians() {
        let t = ArbiterThresholds::degree_preset();
        assert_relative_eq!(t.coarse, 1.0_f64.to_radians());
        assert_eq!(t.settle_ticks, 50);
    }
}
