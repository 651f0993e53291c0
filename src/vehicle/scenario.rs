use nalgebra::{UnitQuaternion, Vector3};

use super::craft::{Craft, CraftBuilder};
use crate::vessel::{ManeuverNode, PilotInput};

// ---------------------------------------------------------------------------
// Scenario: craft, initial conditions and an optional docking target
// ---------------------------------------------------------------------------

/// Second object in orbit next to the craft.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    pub craft: Craft,
    /// Position of the craft relative to the target, world frame, m.
    pub offset: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub is_docking_port: bool,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub craft: Craft,
    /// Circular orbit radius, m. The orbit lies in the world x-y plane.
    pub orbit_radius: f64,
    pub orientation: UnitQuaternion<f64>,
    pub angular_velocity: Vector3<f64>,
    pub pilot: PilotInput,
    pub target: Option<TargetSpec>,
    pub maneuver_nodes: Vec<ManeuverNode>,
}

// ---------------------------------------------------------------------------
// Scenario builder
// ---------------------------------------------------------------------------

pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scenario: Scenario {
                name: name.into(),
                craft: CraftBuilder::new("Craft").build(),
                orbit_radius: 700_000.0,
                orientation: UnitQuaternion::identity(),
                angular_velocity: Vector3::zeros(),
                pilot: PilotInput::default(),
                target: None,
                maneuver_nodes: Vec::new(),
            },
        }
    }

    pub fn craft(mut self, craft: Craft) -> Self { self.scenario.craft = craft; self }
    pub fn orbit_radius(mut self, r: f64) -> Self { self.scenario.orbit_radius = r; self }
    pub fn orientation(mut self, q: UnitQuaternion<f64>) -> Self { self.scenario.orientation = q; self }
    pub fn angular_velocity(mut self, w: Vector3<f64>) -> Self { self.scenario.angular_velocity = w; self }
    pub fn pilot(mut self, pilot: PilotInput) -> Self { self.scenario.pilot = pilot; self }
    pub fn target(mut self, target: TargetSpec) -> Self { self.scenario.target = Some(target); self }

    pub fn maneuver_node(mut self, burn_vector: Vector3<f64>) -> Self {
        self.scenario.maneuver_nodes.push(ManeuverNode { burn_vector });
        self
    }

    pub fn build(self) -> Scenario {
        self.scenario
    }
}

// ---------------------------------------------------------------------------
// Preset scenarios
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;

    /// Small probe tumbling slowly, SAS and RCS both available.
    pub fn tumbling_probe() -> Scenario {
        ScenarioBuilder::new("Tumbling probe")
            .craft(
                CraftBuilder::new("Probe")
                    .mass(1_200.0)
                    .inertia(Vector3::new(4.0, 2.5, 4.0))
                    .wheel_torque(Vector3::new(5.0, 5.0, 5.0))
                    .rcs_torque(Vector3::new(10.0, 8.0, 10.0))
                    .build(),
            )
            .angular_velocity(Vector3::new(0.15, -0.05, 0.1))
            .pilot(PilotInput { sas: true, rcs: true, ..Default::default() })
            .build()
    }

    /// Capsule 25 m in front of a station's port, 3 m off axis, facing it.
    pub fn station_approach() -> Scenario {
        ScenarioBuilder::new("Station approach")
            .craft(CraftBuilder::new("Capsule").docking_port(crate::math::forward()).build())
            .orientation(UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::PI))
            .pilot(PilotInput { rcs: true, ..Default::default() })
            .target(TargetSpec {
                craft: Craft::inert("Station", 40_000.0),
                offset: Vector3::new(3.0, 25.0, 0.0),
                orientation: UnitQuaternion::identity(),
                is_docking_port: true,
            })
            .build()
    }
}
