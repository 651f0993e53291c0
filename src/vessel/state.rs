use nalgebra::{UnitQuaternion, Vector3};

use crate::math;

// ---------------------------------------------------------------------------
// Per-tick snapshot supplied by the host simulation
// ---------------------------------------------------------------------------

/// Read-only vehicle state for one control tick.
///
/// World-frame vectors share one inertial frame. Per-axis capability vectors
/// (`torque_available`, `moment_of_inertia`) are in body-axis order
/// (pitch, roll, yaw) = (x, y, z).
#[derive(Debug, Clone)]
pub struct ExternalState {
    pub time: f64,
    pub orientation: UnitQuaternion<f64>,  // body -> world
    pub angular_velocity: Vector3<f64>,    // rad/s, body frame
    pub position: Vector3<f64>,            // m, world
    pub orbital_velocity: Vector3<f64>,    // m/s, world
    pub surface_velocity: Vector3<f64>,    // m/s, world, relative to the rotating surface
    pub up: Vector3<f64>,                  // local radial-out unit vector
    pub north: Vector3<f64>,               // local geographic north unit vector
    pub normal_plus: Vector3<f64>,         // orbit normal unit vector
    pub torque_available: Vector3<f64>,    // N*m, body order (pitch, roll, yaw)
    pub thrust_torque_available: f64,      // N*m on pitch/yaw at full throttle
    pub moment_of_inertia: Vector3<f64>,   // kg*m^2, body order (pitch, roll, yaw)
    pub mass: f64,                         // kg
    pub rcs_thrust: DirectionalThrust,
    pub target: Option<TargetInfo>,
    pub maneuver_nodes: Vec<ManeuverNode>,
    /// Forward axes of the vessel's own docking ports, body frame.
    pub docking_ports: Vec<Vector3<f64>>,
    pub pilot: PilotInput,
}

impl ExternalState {
    /// Nose direction in world frame.
    pub fn forward(&self) -> Vector3<f64> {
        self.orientation * math::forward()
    }

    /// Dorsal direction in world frame.
    pub fn dorsal(&self) -> Vector3<f64> {
        self.orientation * math::up()
    }

    pub fn right(&self) -> Vector3<f64> {
        self.orientation * math::right()
    }

    /// Body angular momentum, body order (pitch, roll, yaw).
    pub fn angular_momentum(&self) -> Vector3<f64> {
        self.moment_of_inertia.component_mul(&self.angular_velocity)
    }

    /// True when one of the vessel's docking ports points along its nose
    /// within `max_deg`, i.e. the vessel is controlled from a port.
    pub fn has_on_axis_port(&self, max_deg: f64) -> bool {
        self.docking_ports
            .iter()
            .any(|axis| math::angle_between_deg(axis, &math::forward()) < max_deg)
    }

    pub fn first_maneuver_node(&self) -> Option<&ManeuverNode> {
        self.maneuver_nodes.first()
    }

    /// A quiescent snapshot: identity attitude on a circular equatorial orbit
    /// frame with unit torque and inertia. Handy for hosts and tests.
    pub fn at_rest() -> Self {
        Self {
            time: 0.0,
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
            position: Vector3::new(0.0, 0.0, 700_000.0),
            orbital_velocity: Vector3::new(0.0, 2_300.0, 0.0),
            surface_velocity: Vector3::new(0.0, 2_100.0, 0.0),
            up: Vector3::z(),
            north: Vector3::x(),
            normal_plus: Vector3::new(-1.0, 0.0, 0.0),
            torque_available: Vector3::new(20.0, 20.0, 20.0),
            thrust_torque_available: 0.0,
            moment_of_inertia: Vector3::new(10.0, 10.0, 10.0),
            mass: 5_000.0,
            rcs_thrust: DirectionalThrust::uniform(1_000.0),
            target: None,
            maneuver_nodes: Vec::new(),
            docking_ports: vec![math::forward()],
            pilot: PilotInput::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Target and maneuver data (read-only collaborators)
// ---------------------------------------------------------------------------

/// Selected target object.
#[derive(Debug, Clone)]
pub struct TargetInfo {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>, // target body -> world
    pub is_docking_port: bool,
}

impl TargetInfo {
    pub fn forward(&self) -> Vector3<f64> {
        self.orientation * math::forward()
    }

    pub fn up(&self) -> Vector3<f64> {
        self.orientation * math::up()
    }

    pub fn right(&self) -> Vector3<f64> {
        self.orientation * math::right()
    }

    /// Approach axis, pointing out of the target toward a docking chaser.
    pub fn docking_axis(&self) -> Vector3<f64> {
        if self.is_docking_port {
            self.forward()
        } else {
            self.up()
        }
    }

    /// Vessel position relative to the target.
    pub fn relative_position(&self, vessel: &ExternalState) -> Vector3<f64> {
        vessel.position - self.position
    }

    /// Vessel velocity relative to the target.
    pub fn relative_velocity(&self, vessel: &ExternalState) -> Vector3<f64> {
        vessel.orbital_velocity - self.velocity
    }
}

#[derive(Debug, Clone)]
pub struct ManeuverNode {
    pub burn_vector: Vector3<f64>, // m/s, world
}

// ---------------------------------------------------------------------------
// Operator input and actuator capability
// ---------------------------------------------------------------------------

/// The operator's raw flight-control state, plus the host's current
/// continuous (SAS) and discrete (RCS) channel toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct PilotInput {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub pitch_trim: f64,
    pub yaw_trim: f64,
    pub roll_trim: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub throttle: f64,
    pub sas: bool,
    pub rcs: bool,
}

/// Translational thrust available along each body axis, split by sign.
#[derive(Debug, Clone, Copy)]
pub struct DirectionalThrust {
    pub positive: Vector3<f64>, // N along +x, +y, +z
    pub negative: Vector3<f64>, // N along -x, -y, -z (magnitudes)
}

impl DirectionalThrust {
    pub fn uniform(thrust: f64) -> Self {
        let v = Vector3::repeat(thrust);
        Self { positive: v, negative: v }
    }

    pub fn zero() -> Self {
        Self { positive: Vector3::zeros(), negative: Vector3::zeros() }
    }

    /// Thrust available along a body-frame direction.
    pub fn magnitude_along(&self, dir_body: &Vector3<f64>) -> f64 {
        let n = dir_body.norm();
        if n < 1e-12 {
            return 0.0;
        }
        let d = dir_body / n;
        let mut sum = 0.0;
        for i in 0..3 {
            let t = if d[i] >= 0.0 { self.positive[i] } else { self.negative[i] };
            sum += (d[i] * t).powi(2);
        }
        sum.sqrt()
    }

    /// Thrust available along a world-frame direction for a vessel at `orientation`.
    pub fn magnitude_along_world(
        &self,
        orientation: &UnitQuaternion<f64>,
        dir_world: &Vector3<f64>,
    ) -> f64 {
        self.magnitude_along(&orientation.inverse_transform_vector(dir_world))
    }
}
