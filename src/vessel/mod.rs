pub mod state;
pub mod command;

pub use state::{DirectionalThrust, ExternalState, ManeuverNode, PilotInput, TargetInfo};
pub use command::{AxisAuthority, FlightCommand};
