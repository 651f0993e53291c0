pub mod math;
pub mod error;
pub mod config;
pub mod vessel;
pub mod reference;
mod gnc_mod;
pub mod dynamics;
pub mod vehicle;
pub mod sim;
pub mod io;

// The gnc module: expose gnc_mod as `gnc` publicly
pub mod gnc {
    pub use crate::gnc_mod::*;
}

pub use config::AutopilotConfig;
pub use error::{AutopilotError, Result};
pub use gnc::{Autopilot, Controller};
pub use reference::ReferenceTag;
pub use vessel::{ExternalState, FlightCommand};
