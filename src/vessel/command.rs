use nalgebra::Vector3;

use super::state::PilotInput;

// ---------------------------------------------------------------------------
// Control output
// ---------------------------------------------------------------------------

/// One tick of actuator commands pushed back to the host.
///
/// Rotation and translation values are in [-1, 1]. `sas`/`rcs` are the
/// requested engage state of the continuous and discrete channels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlightCommand {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub throttle: f64,
    pub sas: bool,
    pub rcs: bool,
    pub authority: AxisAuthority,
}

/// Which axis groups were written by the autopilot this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisAuthority {
    pub pitch_yaw: bool,
    pub roll: bool,
    pub translation: bool,
}

impl FlightCommand {
    /// Start from the operator's input; the autopilot overwrites what it owns.
    pub fn from_pilot(pilot: &PilotInput) -> Self {
        Self {
            pitch: pilot.pitch,
            yaw: pilot.yaw,
            roll: pilot.roll,
            x: pilot.x,
            y: pilot.y,
            z: pilot.z,
            throttle: pilot.throttle,
            sas: pilot.sas,
            rcs: pilot.rcs,
            authority: AxisAuthority::default(),
        }
    }

    /// Rotation command in control order (pitch, yaw, roll).
    pub fn rotation(&self) -> Vector3<f64> {
        Vector3::new(self.pitch, self.yaw, self.roll)
    }

    /// Translation command in body order (right, forward, up).
    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}
