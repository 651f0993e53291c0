use nalgebra::Vector3;

use crate::dynamics::state::G0;
use crate::vessel::DirectionalThrust;

// ---------------------------------------------------------------------------
// Craft definition (rigid body with wheels, RCS and SAS)
// ---------------------------------------------------------------------------

/// Physical model the simulation harness flies. Per-axis vectors are in
/// body order (pitch, roll, yaw) = (x, y, z).
#[derive(Debug, Clone)]
pub struct Craft {
    pub name: String,
    pub mass: f64,                      // kg, wet
    pub inertia: Vector3<f64>,          // principal moments, kg*m^2
    pub wheel_torque: Vector3<f64>,     // reaction wheels, N*m
    pub rcs_torque: Vector3<f64>,       // extra N*m while RCS is on
    pub rcs_thrust: DirectionalThrust,  // N per body direction
    pub rcs_isp: f64,                   // s
    pub sas_gain: f64,                  // rate damping, 1/s
    /// Forward axes of the craft's own docking ports, body frame.
    pub docking_ports: Vec<Vector3<f64>>,
}

impl Craft {
    /// Torque available per axis with RCS on or off.
    pub fn torque_available(&self, rcs_on: bool) -> Vector3<f64> {
        if rcs_on {
            self.wheel_torque + self.rcs_torque
        } else {
            self.wheel_torque
        }
    }

    /// Monopropellant flow at full thrust on one RCS axis, kg/s.
    pub fn rcs_mass_flow(&self, thrust: f64) -> f64 {
        if self.rcs_isp > 0.0 {
            thrust / (self.rcs_isp * G0)
        } else {
            0.0
        }
    }

    /// Peak angular acceleration per axis, rad/s^2.
    pub fn max_angular_accel(&self, rcs_on: bool) -> Vector3<f64> {
        self.torque_available(rcs_on).component_div(&self.inertia)
    }

    /// A passive body: no actuators.
    pub fn inert(name: impl Into<String>, mass: f64) -> Self {
        CraftBuilder::new(name)
            .mass(mass)
            .wheel_torque(Vector3::zeros())
            .rcs_torque(Vector3::zeros())
            .rcs_thrust(DirectionalThrust::zero())
            .sas_gain(0.0)
            .build()
    }
}

// ---------------------------------------------------------------------------
// Craft builder
// ---------------------------------------------------------------------------

pub struct CraftBuilder {
    name: String,
    mass: f64,
    inertia: Vector3<f64>,
    wheel_torque: Vector3<f64>,
    rcs_torque: Vector3<f64>,
    rcs_thrust: DirectionalThrust,
    rcs_isp: f64,
    sas_gain: f64,
    docking_ports: Vec<Vector3<f64>>,
}

impl CraftBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mass: 5_000.0,
            inertia: Vector3::new(10.0, 10.0, 10.0),
            wheel_torque: Vector3::new(20.0, 20.0, 20.0),
            rcs_torque: Vector3::new(40.0, 40.0, 40.0),
            rcs_thrust: DirectionalThrust::uniform(1_000.0),
            rcs_isp: 240.0,
            sas_gain: 2.0,
            docking_ports: Vec::new(),
        }
    }

    pub fn mass(mut self, v: f64) -> Self { self.mass = v; self }
    pub fn inertia(mut self, v: Vector3<f64>) -> Self { self.inertia = v; self }
    pub fn wheel_torque(mut self, v: Vector3<f64>) -> Self { self.wheel_torque = v; self }
    pub fn rcs_torque(mut self, v: Vector3<f64>) -> Self { self.rcs_torque = v; self }
    pub fn rcs_thrust(mut self, v: DirectionalThrust) -> Self { self.rcs_thrust = v; self }
    pub fn rcs_isp(mut self, v: f64) -> Self { self.rcs_isp = v; self }
    pub fn sas_gain(mut self, v: f64) -> Self { self.sas_gain = v; self }

    pub fn docking_port(mut self, axis: Vector3<f64>) -> Self {
        self.docking_ports.push(axis);
        self
    }

    pub fn build(self) -> Craft {
        Craft {
            name: self.name,
            mass: self.mass,
            inertia: self.inertia,
            wheel_torque: self.wheel_torque,
            rcs_torque: self.rcs_torque,
            rcs_thrust: self.rcs_thrust,
            rcs_isp: self.rcs_isp,
            sas_gain: self.sas_gain,
            docking_ports: self.docking_ports,
        }
    }
}
