use nalgebra::Vector3;
use serde::Serialize;

use crate::reference::ReferenceTag;

// ---------------------------------------------------------------------------
// Read-only display snapshots (render path)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttitudeTelemetry {
    pub active: bool,
    pub reference: ReferenceTag,
    /// Degrees between the target's forward axis and the nose.
    pub angle_from_target: f64,
    /// Moving average of `angle_from_target`.
    pub steering_error: f64,
    /// Euler error, degrees, control order (pitch, yaw, roll).
    pub euler_error: Vector3<f64>,
    pub pid_proportional: Vector3<f64>,
    pub pid_integral: Vector3<f64>,
    pub pid_derivative: Vector3<f64>,
    pub pid_action: Vector3<f64>,
    pub filtered_action: Vector3<f64>,
    pub time_constant: f64,
    pub kill_rotation: bool,
    pub resets: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArbiterTelemetry {
    pub mode: String,
    pub status: String,
    pub settle_counter: u32,
    pub sas: bool,
    pub rcs: bool,
    pub conserve_fuel: bool,
    pub sas_permitted: bool,
    pub rcs_permitted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DockingTelemetry {
    pub enabled: bool,
    pub phase: String,
    pub status: String,
    /// Signed distance in front of the docking port, m.
    pub z_separation: f64,
    pub lateral_separation: f64,
    /// Relative velocity in the vessel frame (right, forward, up), m/s.
    pub relative_velocity: Vector3<f64>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Telemetry {
    pub time: f64,
    pub attitude: AttitudeTelemetry,
    pub arbiter: ArbiterTelemetry,
    pub docking: DockingTelemetry,
    pub rcs_engaged: bool,
    /// Velocity-matching error in the vessel frame, m/s.
    pub rcs_velocity_error: Vector3<f64>,
}

