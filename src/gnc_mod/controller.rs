use super::telemetry::Telemetry;
use crate::config::AutopilotConfig;
use crate::vessel::{ExternalState, FlightCommand};

/// Lifecycle of a flight controller driven by a host simulation.
///
/// The host calls `tick` once per physics step and `render` as often as it
/// likes; only `tick` mutates controller state.
pub trait Controller {
    /// Apply operator settings.
    fn configure(&mut self, _config: &AutopilotConfig) {}

    /// Called when the controller takes over. `state` carries the operator's
    /// current channel toggles.
    fn on_enable(&mut self, _state: &ExternalState) {}

    /// Called when the controller hands control back.
    fn on_disable(&mut self) {}

    /// Compute actuator commands for one physics step.
    fn tick(&mut self, state: &ExternalState, dt: f64) -> FlightCommand;

    /// Read-only display snapshot.
    fn render(&self) -> Telemetry {
        Telemetry::default()
    }

    /// Reset controller internal state (e.g., PID integrators).
    fn reset(&mut self) {}

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}
