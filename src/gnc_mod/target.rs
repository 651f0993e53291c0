//! Attitude target bookkeeping: what orientation the autopilot is holding,
//! in which reference frame, who asked for it, and whether the change was
//! large enough that the controller must start over.

use nalgebra::{UnitQuaternion, Vector3};
use tracing::{debug, warn};

use super::users::{UserId, UserRegistry};
use crate::error::{AutopilotError, Result};
use crate::math::{self, angle_between_deg, from_heading_pitch_roll, is_valid_orientation, look_rotation};
use crate::reference::{self, ReferenceTag};
use crate::vessel::ExternalState;

/// Forward-axis change that forces a controller reset, degrees (exclusive).
pub const RESET_ANGLE_DEG: f64 = 10.0;

/// Rounding slack on the reset boundary; acos of an exact 10 degree pair
/// can land a few ulps above 10.
const RESET_ANGLE_SLACK_DEG: f64 = 1e-9;

/// Direction change beyond which the previous target's up vector is not
/// carried over, degrees.
pub const HANDOFF_ANGLE_DEG: f64 = 45.0;

#[derive(Debug, Clone)]
pub struct AttitudeTarget {
    reference: ReferenceTag,
    target: UnitQuaternion<f64>,
    // target that last raised `changed`; drift is measured against it
    last_reset_target: UnitQuaternion<f64>,
    roll_matters: bool,
    changed: bool,
    users: UserRegistry,
}

impl Default for AttitudeTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl AttitudeTarget {
    pub fn new() -> Self {
        Self {
            reference: ReferenceTag::Inertial,
            target: UnitQuaternion::identity(),
            last_reset_target: UnitQuaternion::identity(),
            roll_matters: false,
            changed: false,
            users: UserRegistry::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn reference(&self) -> ReferenceTag {
        self.reference
    }

    /// Target orientation relative to its reference frame.
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.target
    }

    pub fn roll_matters(&self) -> bool {
        self.roll_matters
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn is_active(&self) -> bool {
        self.users.is_active()
    }

    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    pub fn register(&mut self, user: UserId) {
        self.users.register(user);
    }

    pub fn unregister(&mut self, user: UserId) {
        self.users.unregister(user);
    }

    // -----------------------------------------------------------------------
    // Setters
    // -----------------------------------------------------------------------

    fn set_reference(&mut self, reference: ReferenceTag) {
        if self.reference != reference {
            debug!(from = %self.reference, to = %reference, "attitude reference changed");
            self.reference = reference;
            self.changed = true;
        }
    }

    fn set_orientation(&mut self, orientation: UnitQuaternion<f64>) {
        let drift = angle_between_deg(
            &(self.last_reset_target * math::forward()),
            &(orientation * math::forward()),
        );
        if drift > RESET_ANGLE_DEG + RESET_ANGLE_SLACK_DEG {
            self.last_reset_target = orientation;
            self.changed = true;
        }
        self.target = orientation;
    }

    /// Hold `orientation` expressed in `reference`, on behalf of `user`.
    pub fn attitude_to(
        &mut self,
        orientation: UnitQuaternion<f64>,
        reference: ReferenceTag,
        user: UserId,
    ) -> Result<()> {
        if !is_valid_orientation(&orientation) {
            return Err(AutopilotError::InvalidOrientation);
        }
        self.users.register(user);
        self.set_reference(reference);
        self.set_orientation(orientation);
        self.roll_matters = true;
        Ok(())
    }

    /// Point the nose along `direction` (in `reference`); roll is left free.
    ///
    /// Up is carried over from the previous target when the new direction is
    /// within 45 degrees of the current one, otherwise the vessel's current
    /// dorsal axis is used.
    pub fn attitude_to_direction(
        &mut self,
        direction: Vector3<f64>,
        reference: ReferenceTag,
        user: UserId,
        state: &ExternalState,
    ) -> Result<()> {
        if !direction.iter().all(|c| c.is_finite()) || direction.norm_squared() < 1e-18 {
            return Err(AutopilotError::InvalidDirection);
        }
        let orientation = self.direction_orientation(&direction, reference, state);
        self.attitude_to(orientation, reference, user)?;
        self.roll_matters = false;
        Ok(())
    }

    fn direction_orientation(
        &mut self,
        direction: &Vector3<f64>,
        reference: ReferenceTag,
        state: &ExternalState,
    ) -> UnitQuaternion<f64> {
        let current_ref = self.reference_rotation(self.reference, state);
        let new_ref = self.reference_rotation(reference, state);
        let current_fwd = current_ref * self.target * math::forward();
        let ang_diff = angle_between_deg(&current_fwd, &(new_ref * direction));

        let up = if !self.is_active() || ang_diff > HANDOFF_ANGLE_DEG {
            new_ref.inverse_transform_vector(&state.dorsal())
        } else {
            let prev_up_world = current_ref * self.target * math::up();
            new_ref.inverse_transform_vector(&prev_up_world)
        };
        look_rotation(direction, &up)
    }

    /// Surface attitude from heading/pitch/roll in degrees (SURFACE_NORTH).
    pub fn attitude_to_hpr(&mut self, heading: f64, pitch: f64, roll: f64, user: UserId) -> Result<()> {
        self.attitude_to(from_heading_pitch_roll(heading, pitch, roll), ReferenceTag::SurfaceNorth, user)
    }

    /// Rebuild the target with the same forward axis and the vessel's current
    /// dorsal axis as up. Used while roll does not matter.
    pub fn realign_roll(&mut self, state: &ExternalState) {
        if !self.is_active() {
            return;
        }
        let ref_rot = self.reference_rotation(self.reference, state);
        if !self.is_active() {
            return;
        }
        let up = ref_rot.inverse_transform_vector(&state.dorsal());
        let orientation = look_rotation(&(self.target * math::forward()), &up);
        self.set_orientation(orientation);
        self.roll_matters = false;
    }

    /// Release all users and force a controller reset on the next tick.
    /// Idempotent.
    pub fn deactivate(&mut self) {
        if self.is_active() {
            debug!(users = self.users.len(), "attitude target deactivated");
        }
        self.users.clear();
        self.reference = ReferenceTag::Inertial;
        self.target = UnitQuaternion::identity();
        self.last_reset_target = UnitQuaternion::identity();
        self.roll_matters = false;
        self.changed = true;
    }

    /// Consume the change edge. Returns the reference in force if a reset is due.
    pub fn take_changed(&mut self) -> Option<ReferenceTag> {
        if self.changed {
            self.changed = false;
            Some(self.reference)
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Frame resolution
    // -----------------------------------------------------------------------

    /// Resolve a reference frame; a missing target or node deactivates this
    /// target and yields the identity.
    pub fn reference_rotation(&mut self, tag: ReferenceTag, state: &ExternalState) -> UnitQuaternion<f64> {
        match reference::resolve(tag, state) {
            Ok(q) => q,
            Err(err) => {
                if self.is_active() {
                    warn!(%err, "attitude reference unavailable, deactivating");
                }
                self.deactivate();
                UnitQuaternion::identity()
            }
        }
    }

    pub fn world_to_reference(&mut self, v: &Vector3<f64>, tag: ReferenceTag, state: &ExternalState) -> Vector3<f64> {
        self.reference_rotation(tag, state).inverse_transform_vector(v)
    }

    pub fn reference_to_world(&mut self, v: &Vector3<f64>, tag: ReferenceTag, state: &ExternalState) -> Vector3<f64> {
        self.reference_rotation(tag, state) * v
    }

    /// Target orientation in the world frame.
    pub fn world_target(&mut self, state: &ExternalState) -> UnitQuaternion<f64> {
        self.reference_rotation(self.reference, state) * self.target
    }

    /// Angle between the target's forward axis and the vessel's nose,
    /// degrees, ignoring roll. Zero while inactive.
    pub fn angle_from_target(&mut self, state: &ExternalState) -> f64 {
        if !self.is_active() {
            return 0.0;
        }
        let target_fwd = self.world_target(state) * math::forward();
        if !self.is_active() {
            return 0.0;
        }
        angle_between_deg(&target_fwd, &state.forward())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn yawed(deg: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), deg.to_radians())
    }

    #[test]
    fn reference_change_raises_changed_once() {
        let mut t = AttitudeTarget::new();
        t.attitude_to(UnitQuaternion::identity(), ReferenceTag::SurfaceNorth, UserId::OPERATOR).unwrap();
        assert_eq!(t.take_changed(), Some(ReferenceTag::SurfaceNorth));
        assert_eq!(t.take_changed(), None);
        t.attitude_to(UnitQuaternion::identity(), ReferenceTag::SurfaceNorth, UserId::OPERATOR).unwrap();
        assert!(!t.changed());
    }

    #[test]
    fn small_forward_change_does_not_reset() {
        let mut t = AttitudeTarget::new();
        t.attitude_to(yawed(9.9), ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        assert!(!t.changed(), "9.9 degrees is within the reset band");
        t.attitude_to(yawed(10.1), ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        assert!(t.changed(), "10.1 degrees from the last reset target must reset");
    }

    #[test]
    fn exactly_ten_degrees_does_not_reset() {
        let mut t = AttitudeTarget::new();
        t.attitude_to(yawed(10.0), ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        assert!(!t.changed(), "the 10 degree boundary is exclusive");

        let mut t = AttitudeTarget::new();
        let a = 10.0_f64.to_radians();
        let tilted = look_rotation(&Vector3::new(a.sin(), a.cos(), 0.0), &Vector3::z());
        assert_relative_eq!(angle_between_deg(&math::forward(), &(tilted * math::forward())), 10.0, epsilon = 1e-9);
        t.attitude_to(tilted, ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        assert!(!t.changed());
    }

    #[test]
    fn drift_accumulates_against_last_reset_target() {
        let mut t = AttitudeTarget::new();
        for step in 1..=4 {
            t.attitude_to(yawed(3.0 * step as f64), ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        }
        // 12 degrees total from identity, each step only 3
        assert!(t.changed());
    }

    #[test]
    fn roll_only_change_does_not_reset() {
        let mut t = AttitudeTarget::new();
        let roll = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.0);
        t.attitude_to(roll, ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        assert!(!t.changed());
        assert!(t.roll_matters());
    }

    #[test]
    fn invalid_orientation_rejected() {
        let mut t = AttitudeTarget::new();
        let bad = UnitQuaternion::new_unchecked(nalgebra::Quaternion::new(f64::NAN, 0.0, 0.0, 0.0));
        assert!(matches!(
            t.attitude_to(bad, ReferenceTag::Orbit, UserId::OPERATOR),
            Err(AutopilotError::InvalidOrientation)
        ));
        assert!(!t.is_active());
        assert_eq!(t.reference(), ReferenceTag::Inertial);
    }

    #[test]
    fn direction_target_frees_roll_and_uses_dorsal_when_inactive() {
        let mut t = AttitudeTarget::new();
        let mut state = ExternalState::at_rest();
        state.orientation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.4);
        t.attitude_to_direction(Vector3::x(), ReferenceTag::Inertial, UserId::OPERATOR, &state).unwrap();
        assert!(!t.roll_matters());
        let q = t.orientation();
        assert_relative_eq!(q * math::forward(), Vector3::x(), epsilon = 1e-12);
        let expected_up = crate::math::exclude(&Vector3::x(), &state.dorsal()).normalize();
        assert_relative_eq!(q * math::up(), expected_up, epsilon = 1e-12);
    }

    #[test]
    fn direction_target_carries_up_for_small_changes() {
        let mut t = AttitudeTarget::new();
        let state = ExternalState::at_rest();
        let start = crate::math::look_rotation(&Vector3::y(), &Vector3::x());
        t.attitude_to(start, ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        let dir = Vector3::new(0.2, 1.0, 0.0);
        t.attitude_to_direction(dir, ReferenceTag::Inertial, UserId::OPERATOR, &state).unwrap();
        // previous up (+x) survives, orthogonalized against the new forward
        let up = t.orientation() * math::up();
        assert!(up.x > 0.9, "up should stay near +x, got {up:?}");
    }

    #[test]
    fn zero_direction_rejected() {
        let mut t = AttitudeTarget::new();
        let state = ExternalState::at_rest();
        assert!(matches!(
            t.attitude_to_direction(Vector3::zeros(), ReferenceTag::Orbit, UserId::OPERATOR, &state),
            Err(AutopilotError::InvalidDirection)
        ));
    }

    #[test]
    fn deactivate_is_idempotent() {
        let mut t = AttitudeTarget::new();
        t.attitude_to(yawed(30.0), ReferenceTag::Orbit, UserId::OPERATOR).unwrap();
        t.take_changed();
        t.deactivate();
        t.deactivate();
        assert!(!t.is_active());
        assert!(t.changed());
        assert_eq!(t.reference(), ReferenceTag::Inertial);
        assert_eq!(t.orientation(), UnitQuaternion::identity());
    }

    #[test]
    fn missing_target_deactivates_and_returns_identity() {
        let mut t = AttitudeTarget::new();
        let state = ExternalState::at_rest();
        t.attitude_to(yawed(0.0), ReferenceTag::Target, UserId::OPERATOR).unwrap();
        for _ in 0..3 {
            let q = t.reference_rotation(ReferenceTag::Target, &state);
            assert_eq!(q, UnitQuaternion::identity());
            assert!(!t.is_active());
        }
    }

    #[test]
    fn angle_from_target_zero_when_inactive() {
        let mut t = AttitudeTarget::new();
        let state = ExternalState::at_rest();
        assert_eq!(t.angle_from_target(&state), 0.0);
        t.attitude_to(yawed(90.0), ReferenceTag::Inertial, UserId::OPERATOR).unwrap();
        assert_relative_eq!(t.angle_from_target(&state), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn hpr_targets_surface_north() {
        let mut t = AttitudeTarget::new();
        let state = ExternalState::at_rest();
        t.attitude_to_hpr(90.0, 0.0, 0.0, UserId::OPERATOR).unwrap();
        assert_eq!(t.reference(), ReferenceTag::SurfaceNorth);
        let fwd = t.world_target(&state) * math::forward();
        // at_rest: north = +x, up = +z, so east = -y
        assert_relative_eq!(fwd, -Vector3::y(), epsilon = 1e-12);
    }
}
