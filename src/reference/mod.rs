//! Symbolic attitude reference frames and their resolution to world orientations.

use std::fmt;

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{AutopilotError, Result};
use crate::math::{exclude, look_rotation, ortho_normalize};
use crate::vessel::ExternalState;

/// Frame against which an attitude target is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceTag {
    /// World coordinate system.
    #[default]
    Inertial,
    /// Forward = prograde, up = radial out.
    Orbit,
    /// Forward = prograde projected on the local horizontal, up = radial out.
    OrbitHorizontal,
    /// Forward = geographic north, up = radial out.
    SurfaceNorth,
    /// Forward = surface-relative velocity, up = radial out.
    SurfaceVelocity,
    /// Forward = toward the target.
    Target,
    /// Forward = velocity relative to the target.
    RelativeVelocity,
    /// Forward/up taken from the target's own orientation.
    TargetOrientation,
    /// Forward = burn vector of the first maneuver node.
    ManeuverNode,
}

impl ReferenceTag {
    pub const ALL: [ReferenceTag; 9] = [
        ReferenceTag::Inertial,
        ReferenceTag::Orbit,
        ReferenceTag::OrbitHorizontal,
        ReferenceTag::SurfaceNorth,
        ReferenceTag::SurfaceVelocity,
        ReferenceTag::Target,
        ReferenceTag::RelativeVelocity,
        ReferenceTag::TargetOrientation,
        ReferenceTag::ManeuverNode,
    ];

    /// Whether resolving this tag needs a selected target.
    pub fn needs_target(self) -> bool {
        matches!(
            self,
            ReferenceTag::Target | ReferenceTag::RelativeVelocity | ReferenceTag::TargetOrientation
        )
    }

    /// Whether resolving this tag can fail for lack of external data.
    pub fn is_conditional(self) -> bool {
        self.needs_target() || self == ReferenceTag::ManeuverNode
    }
}

impl fmt::Display for ReferenceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReferenceTag::Inertial => "INERTIAL",
            ReferenceTag::Orbit => "ORBIT",
            ReferenceTag::OrbitHorizontal => "ORBIT_HORIZONTAL",
            ReferenceTag::SurfaceNorth => "SURFACE_NORTH",
            ReferenceTag::SurfaceVelocity => "SURFACE_VELOCITY",
            ReferenceTag::Target => "TARGET",
            ReferenceTag::RelativeVelocity => "RELATIVE_VELOCITY",
            ReferenceTag::TargetOrientation => "TARGET_ORIENTATION",
            ReferenceTag::ManeuverNode => "MANEUVER_NODE",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve `tag` against a state snapshot into a reference -> world rotation.
///
/// Pure: the same inputs always give the same orientation. Target-dependent
/// tags fail with [`AutopilotError::MissingReference`] when no target (or
/// maneuver node) is present.
pub fn resolve(tag: ReferenceTag, state: &ExternalState) -> Result<UnitQuaternion<f64>> {
    match tag {
        ReferenceTag::Inertial => Ok(UnitQuaternion::identity()),
        ReferenceTag::Orbit => Ok(look_rotation(&state.orbital_velocity, &state.up)),
        ReferenceTag::OrbitHorizontal => Ok(look_rotation(
            &exclude(&state.up, &state.orbital_velocity),
            &state.up,
        )),
        ReferenceTag::SurfaceNorth => Ok(look_rotation(&state.north, &state.up)),
        ReferenceTag::SurfaceVelocity => Ok(look_rotation(&state.surface_velocity, &state.up)),
        ReferenceTag::Target => {
            let target = state.target.as_ref().ok_or(AutopilotError::MissingReference(tag))?;
            Ok(normal_framed(&(target.position - state.position), state))
        }
        ReferenceTag::RelativeVelocity => {
            let target = state.target.as_ref().ok_or(AutopilotError::MissingReference(tag))?;
            Ok(normal_framed(&target.relative_velocity(state), state))
        }
        ReferenceTag::TargetOrientation => {
            let target = state.target.as_ref().ok_or(AutopilotError::MissingReference(tag))?;
            if target.is_docking_port {
                Ok(look_rotation(&target.forward(), &target.up()))
            } else {
                Ok(look_rotation(&target.up(), &target.right()))
            }
        }
        ReferenceTag::ManeuverNode => {
            let node = state
                .first_maneuver_node()
                .ok_or(AutopilotError::MissingReference(tag))?;
            Ok(normal_framed(&node.burn_vector, state))
        }
    }
}

/// Forward along `fwd`, up = orbit normal made orthogonal to forward.
fn normal_framed(fwd: &Vector3<f64>, state: &ExternalState) -> UnitQuaternion<f64> {
    if fwd.norm_squared() < 1e-18 {
        return UnitQuaternion::identity();
    }
    let (f, u) = ortho_normalize(fwd, &state.normal_plus);
    look_rotation(&f, &u)
}
