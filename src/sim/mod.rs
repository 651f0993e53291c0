pub mod event;
pub mod integrator;
pub mod runner;

pub use event::{EventDetector, EventKind, SimEvent};
pub use integrator::rk4_step;
pub use runner::{run, simulate, simulate_with, SimRun, Simulation};
