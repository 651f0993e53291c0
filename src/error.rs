use crate::reference::ReferenceTag;

/// Errors surfaced by the autopilot core.
///
/// None of these abort a control tick; callers recover locally (deactivate,
/// hold the last command, clamp the setting).
#[derive(Debug, thiserror::Error)]
pub enum AutopilotError {
    #[error("orientation is not a finite unit quaternion")]
    InvalidOrientation,

    #[error("direction must be finite and non-zero")]
    InvalidDirection,

    #[error("reference {0:?} needs a target or maneuver node that is not present")]
    MissingReference(ReferenceTag),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AutopilotError>;
