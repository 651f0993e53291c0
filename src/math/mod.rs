//! Vector and orientation helpers shared by the steering pipeline.
//!
//! Body frame convention used throughout the crate:
//! `+X` = right (pitch axis), `+Y` = forward/nose (roll axis), `+Z` = dorsal/up (yaw axis).
//! Orientations are unit quaternions mapping body vectors into the world frame.

pub mod orientation;
pub mod average;

pub use orientation::*;
pub use average::MovingAverage;
