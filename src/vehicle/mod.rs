pub mod craft;
pub mod scenario;

pub use craft::{Craft, CraftBuilder};
pub use scenario::{presets, Scenario, ScenarioBuilder, TargetSpec};
