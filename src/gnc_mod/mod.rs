pub mod arbiter;
pub mod attitude;
pub mod autopilot;
pub mod controller;
pub mod docking;
pub mod filter;
pub mod pid;
pub mod rcs;
pub mod steering;
pub mod target;
pub mod telemetry;
pub mod users;

pub use arbiter::{ActuatorArbiter, ArbiterDecision, ArbiterMode, ManualInput};
pub use attitude::AttitudeController;
pub use autopilot::Autopilot;
pub use controller::Controller;
pub use docking::{DockingAutopilot, DockingGeometry, DockingPhase};
pub use filter::LowPassFilter;
pub use pid::{Pid, PidTerms, PidVector};
pub use rcs::ResourceChannel;
pub use steering::{available_torque, SteeringError};
pub use target::{AttitudeTarget, HANDOFF_ANGLE_DEG, RESET_ANGLE_DEG};
pub use telemetry::{ArbiterTelemetry, AttitudeTelemetry, DockingTelemetry, Telemetry};
pub use users::{UserId, UserRegistry};
