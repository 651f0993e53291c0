use nalgebra::{Quaternion, UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// Physical constants (Kerbin-sized body)
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665;
/// Gravitational parameter, m^3/s^2.
pub const MU: f64 = 3.5316e12;
pub const BODY_RADIUS: f64 = 600_000.0;
/// Sidereal rotation rate about world +z, rad/s.
pub const BODY_ROTATION_RATE: f64 = 2.0 * std::f64::consts::PI / 21_549.425;

// ---------------------------------------------------------------------------
// 6DOF State: position, velocity, attitude, angular rate, mass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct State {
    pub time: f64,
    pub pos: Vector3<f64>,              // m, body-centred inertial
    pub vel: Vector3<f64>,              // m/s, inertial
    pub quat: UnitQuaternion<f64>,      // body -> inertial rotation
    pub omega: Vector3<f64>,            // rad/s, body frame angular velocity
    pub mass: f64,                      // kg
}

impl State {
    /// Circular orbit in the x-y plane at `radius`, starting on +x.
    pub fn circular(radius: f64, quat: UnitQuaternion<f64>, omega: Vector3<f64>, mass: f64) -> Self {
        let speed = (MU / radius).sqrt();
        State {
            time: 0.0,
            pos: Vector3::new(radius, 0.0, 0.0),
            vel: Vector3::new(0.0, speed, 0.0),
            quat,
            omega,
            mass,
        }
    }

    pub fn apply(&self, d: &Deriv, dt: f64) -> State {
        let q_raw = self.quat.quaternion() + d.dquat * dt;
        State {
            time: self.time + dt,
            pos: self.pos + d.dpos * dt,
            vel: self.vel + d.dvel * dt,
            quat: UnitQuaternion::new_normalize(q_raw),
            omega: self.omega + d.domega * dt,
            mass: (self.mass + d.dmass * dt).max(0.0),
        }
    }

    /// Radial-out unit vector.
    pub fn up(&self) -> Vector3<f64> {
        self.pos.normalize()
    }

    /// Local north: the spin axis projected on the horizontal plane.
    pub fn north(&self) -> Vector3<f64> {
        let up = self.up();
        let north = Vector3::z() - up * up.z;
        if north.norm_squared() > 1e-12 {
            north.normalize()
        } else {
            Vector3::x()
        }
    }

    /// Velocity relative to the rotating surface.
    pub fn surface_velocity(&self) -> Vector3<f64> {
        self.vel - Vector3::new(0.0, 0.0, BODY_ROTATION_RATE).cross(&self.pos)
    }

    /// Unit orbit normal (r x v).
    pub fn orbit_normal(&self) -> Vector3<f64> {
        let h = self.pos.cross(&self.vel);
        if h.norm_squared() > 1e-12 {
            h.normalize()
        } else {
            Vector3::z()
        }
    }

    pub fn altitude(&self) -> f64 {
        self.pos.norm() - BODY_RADIUS
    }
}

// ---------------------------------------------------------------------------
// State derivative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Deriv {
    pub dpos: Vector3<f64>,
    pub dvel: Vector3<f64>,
    pub dquat: Quaternion<f64>,   // NOT unit: raw quaternion derivative
    pub domega: Vector3<f64>,     // angular acceleration, body frame
    pub dmass: f64,
}

// ---------------------------------------------------------------------------
// Simulation config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub dt: f64,
    pub max_time: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.02,         // 50 Hz physics tick
            max_time: 120.0,
        }
    }
}
