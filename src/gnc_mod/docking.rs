//! Docking approach: face the port, then fly a velocity-matching setpoint
//! through the shared RCS channel.
//!
//! Geometry, all in world frame:
//! - `axis`: unit docking axis pointing out of the port;
//! - `z_sep`: signed distance of the vessel in front of the port;
//! - `lateral`: offset from the axis line to the vessel.

use std::fmt;

use nalgebra::{UnitQuaternion, Vector3};
use tracing::{debug, warn};

use super::attitude::AttitudeController;
use super::rcs::ResourceChannel;
use super::telemetry::DockingTelemetry;
use super::users::UserId;
use crate::config::DockingConfig;
use crate::error::Result;
use crate::math::{self, exclude, look_rotation};
use crate::reference::ReferenceTag;
use crate::vessel::{ExternalState, TargetInfo};

/// Lateral distances beyond this many times the axial one count as far off axis.
const OFF_AXIS_RATIO: f64 = 10.0;
/// Backing up speeds up past this axial distance, m.
const BACKING_SCALE: f64 = 50.0;
/// Own docking port must sit within this of the nose axis, degrees.
const ON_AXIS_PORT_DEG: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DockingPhase {
    #[default]
    Idle,
    /// Behind the port and close to the axis: sidestep before backing up.
    ClearingAxis,
    /// Behind the port with clearance: reverse along the axis.
    BackingUp,
    /// In front but too close for the lateral offset: back off while closing in.
    BackingOff,
    /// In front, closing the lateral offset at a matched axial speed.
    Aligning,
    /// On axis, closing in.
    Approaching,
    /// Within the terminal distance; control handed back.
    Done,
}

impl fmt::Display for DockingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DockingPhase::Idle => "idle",
            DockingPhase::ClearingAxis => "clearing axis",
            DockingPhase::BackingUp => "backing up",
            DockingPhase::BackingOff => "backing off",
            DockingPhase::Aligning => "aligning",
            DockingPhase::Approaching => "approaching",
            DockingPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Relative geometry for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DockingGeometry {
    pub axis: Vector3<f64>,
    pub z_sep: f64,
    pub lateral: Vector3<f64>,
}

impl DockingGeometry {
    pub fn new(vessel: &ExternalState, target: &TargetInfo) -> Self {
        let axis = target.docking_axis().normalize();
        let separation = target.relative_position(vessel);
        Self {
            axis,
            z_sep: separation.dot(&axis),
            lateral: exclude(&axis, &separation),
        }
    }

    pub fn lateral_distance(&self) -> f64 {
        self.lateral.norm()
    }

    /// Unit vector from the axis toward the vessel. On the axis itself any
    /// perpendicular will do.
    pub fn lateral_direction(&self) -> Vector3<f64> {
        let d = self.lateral_distance();
        if d > 1e-9 {
            self.lateral / d
        } else {
            let (_, perp) = math::ortho_normalize(&self.axis, &Vector3::x());
            perp
        }
    }
}

#[derive(Debug, Clone)]
pub struct DockingAutopilot {
    config: DockingConfig,
    enabled: bool,
    phase: DockingPhase,
    status: String,
    geometry: Option<DockingGeometry>,
    relative_velocity: Vector3<f64>, // vessel frame
    warnings: Vec<String>,
}

impl DockingAutopilot {
    pub fn new(config: &DockingConfig) -> Self {
        Self {
            config: config.clone(),
            enabled: false,
            phase: DockingPhase::Idle,
            status: String::new(),
            geometry: None,
            relative_velocity: Vector3::zeros(),
            warnings: Vec::new(),
        }
    }

    pub fn configure(&mut self, config: &DockingConfig) {
        self.config = config.clone();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn phase(&self) -> DockingPhase {
        self.phase
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_roll_lock(&mut self, roll: Option<f64>) {
        self.config.roll_lock = roll;
    }

    /// Take the RCS channel and stop the attitude arbiter from using RCS
    /// for rotation.
    pub fn enable(&mut self, attitude: &mut AttitudeController, rcs: &mut ResourceChannel) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        self.phase = DockingPhase::Idle;
        attitude.arbiter_mut().set_rcs_rotation_authority(false);
        attitude.target_mut().register(UserId::DOCKING);
        rcs.release(UserId::ATTITUDE);
        rcs.request(UserId::DOCKING);
        debug!("docking autopilot enabled");
    }

    pub fn disable(&mut self, attitude: &mut AttitudeController, rcs: &mut ResourceChannel) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        attitude.arbiter_mut().set_rcs_rotation_authority(true);
        attitude.deactivate();
        rcs.release(UserId::DOCKING);
        rcs.clear_target();
        debug!(phase = %self.phase, "docking autopilot disabled");
    }

    fn fix_speed(&self, s: f64) -> f64 {
        let limit = self.config.speed_limit;
        if limit > 0.0 {
            s.clamp(-limit, limit)
        } else {
            s
        }
    }

    /// Speed to close `distance` with the RCS thrust available along `dir`.
    fn approach_speed(&self, state: &ExternalState, distance: f64, dir: &Vector3<f64>) -> f64 {
        if state.mass <= 0.0 {
            return 0.0;
        }
        let thrust = state.rcs_thrust.magnitude_along_world(&state.orientation, dir);
        self.fix_speed((distance.abs() * thrust * self.config.approach_speed_mult / state.mass).sqrt())
    }

    /// Attitude that faces the port, in TARGET_ORIENTATION.
    fn face_port(&self, attitude: &mut AttitudeController, state: &ExternalState) -> Result<()> {
        match self.config.roll_lock {
            Some(roll) => {
                let facing = look_rotation(&-math::forward(), &math::up())
                    * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -roll.to_radians());
                attitude.attitude_to(facing, ReferenceTag::TargetOrientation, UserId::DOCKING)
            }
            None => attitude.attitude_to_direction(
                -math::forward(),
                ReferenceTag::TargetOrientation,
                UserId::DOCKING,
                state,
            ),
        }
    }

    /// One physics tick: steer the attitude target and set the RCS velocity
    /// setpoint.
    pub fn drive(&mut self, state: &ExternalState, attitude: &mut AttitudeController, rcs: &mut ResourceChannel) {
        if !self.enabled {
            return;
        }
        let Some(target) = state.target.as_ref() else {
            self.status = "No target selected".to_string();
            warn!("docking target lost");
            self.disable(attitude, rcs);
            return;
        };

        self.warnings.clear();
        if !target.is_docking_port {
            self.warnings.push("Target is not a docking port; approaching along its up axis".to_string());
        }
        if !state.has_on_axis_port(ON_AXIS_PORT_DEG) {
            self.warnings.push("Vessel is not controlled from a docking port on its nose axis".to_string());
        }
        self.relative_velocity = state
            .orientation
            .inverse_transform_vector(&target.relative_velocity(state));

        if let Err(err) = self.face_port(attitude, state) {
            warn!(%err, "docking attitude rejected");
        }

        let geo = DockingGeometry::new(state, target);
        self.geometry = Some(geo);
        let axis = geo.axis;
        let lat_dist = geo.lateral_distance();
        let lat_dir = geo.lateral_direction();
        let z_speed = self.approach_speed(state, geo.z_sep, &-axis);
        let lat_speed = self.approach_speed(state, lat_dist, &-lat_dir);

        let (phase, velocity) = if geo.z_sep < 0.0 {
            if lat_dist < self.config.backing_clearance {
                self.status = format!(
                    "Moving away from docking axis at {z_speed:.2} m/s to avoid hitting target on backing up"
                );
                (DockingPhase::ClearingAxis, target.velocity + lat_dir * z_speed)
            } else {
                let back_up = self.fix_speed(z_speed * (-geo.z_sep / BACKING_SCALE).max(1.0));
                self.status = format!(
                    "Backing up at {back_up:.2} m/s to get on the correct side of the target to dock"
                );
                (DockingPhase::BackingUp, target.velocity + axis * back_up)
            }
        } else {
            let lateral_needed = -lat_dir * lat_speed;
            let mut z_needed = z_speed;
            let phase = if lat_dist > self.config.off_axis_tolerance && lat_dist * OFF_AXIS_RATIO > geo.z_sep {
                if geo.z_sep < lat_dist {
                    z_needed = -z_needed;
                    self.status = format!("Backing up at {z_needed:.2} m/s and moving toward docking axis");
                    DockingPhase::BackingOff
                } else {
                    z_needed = z_needed.min(geo.z_sep * lateral_needed.norm() / lat_dist);
                    self.status = format!("Moving toward the docking axis at {:.2} m/s", lateral_needed.norm());
                    DockingPhase::Aligning
                }
            } else if geo.z_sep > self.config.terminal_distance {
                self.status = format!("Moving forward to dock at {z_needed:.2} m/s");
                DockingPhase::Approaching
            } else {
                self.status = "Close enough, releasing control".to_string();
                self.set_phase(DockingPhase::Done);
                self.disable(attitude, rcs);
                return;
            };

            let mut adjustment = lateral_needed - axis * z_needed;
            let magnitude = adjustment.norm();
            if magnitude > 0.0 {
                adjustment *= self.fix_speed(magnitude) / magnitude;
            }
            (phase, target.velocity + adjustment)
        };

        self.set_phase(phase);
        rcs.request(UserId::DOCKING);
        rcs.set_target_world_velocity(velocity);
    }

    fn set_phase(&mut self, phase: DockingPhase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, status = %self.status, "docking phase");
            self.phase = phase;
        }
    }

    pub fn geometry(&self) -> Option<DockingGeometry> {
        self.geometry
    }

    pub fn telemetry(&self) -> DockingTelemetry {
        DockingTelemetry {
            enabled: self.enabled,
            phase: self.phase.to_string(),
            status: self.status.clone(),
            z_separation: self.geometry.map(|g| g.z_sep).unwrap_or_default(),
            lateral_separation: self.geometry.map(|g| g.lateral_distance()).unwrap_or_default(),
            relative_velocity: self.relative_velocity,
            warnings: self.warnings.clone(),
        }
    }
}
