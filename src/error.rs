//! Error taxonomy for stack generation and configuration
//!
//! Only structural operations (settings validation, regeneration) can fail.
//! Per-frame propagation writes plain data and has no error path.

use thiserror::Error;

/// Result type alias for shell texturing operations
pub type Result<T> = std::result::Result<T, ShellError>;

/// All errors produced by the layer-stack engine
#[derive(Error, Debug)]
pub enum ShellError {
    // Configuration errors
    #[error("Layer count must be at least 2, got {count}")]
    LayerCountTooSmall { count: usize },

    #[error("Mask resolution must be greater than zero")]
    ZeroResolution,

    #[error("Distribution curve decreases at keyframe {index}")]
    NonMonotonicCurve { index: usize },

    #[error("Distribution curve value {value} is outside [0, 1]")]
    CurveOutOfRange { value: f32 },

    #[error("Invalid setting `{field}`: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("Missing required reference: {what}")]
    MissingReference { what: &'static str },

    // Lifecycle errors
    #[error("Stack has been disposed")]
    Disposed,

    #[error("Stack has not been generated yet")]
    NotGenerated,

    // Settings persistence
    #[error("Settings serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ShellError {
    /// True for errors caused by invalid or incomplete configuration.
    ///
    /// These abort a regeneration but leave the previous layers in place.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ShellError::LayerCountTooSmall { .. }
                | ShellError::ZeroResolution
                | ShellError::NonMonotonicCurve { .. }
                | ShellError::CurveOutOfRange { .. }
                | ShellError::InvalidSetting { .. }
                | ShellError::MissingReference { .. }
        )
    }

    /// Build an `InvalidSetting` error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ShellError::InvalidSetting {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_family() {
        assert!(ShellError::ZeroResolution.is_configuration());
        assert!(ShellError::LayerCountTooSmall { count: 1 }.is_configuration());
        assert!(ShellError::MissingReference { what: "material" }.is_configuration());
        assert!(!ShellError::Disposed.is_configuration());
        assert!(!ShellError::NotGenerated.is_configuration());
    }

    #[test]
    fn test_messages_name_the_problem() {
        let err = ShellError::invalid("radius", "must be >= 0");
        assert_eq!(err.to_string(), "Invalid setting `radius`: must be >= 0");
        let err = ShellError::LayerCountTooSmall { count: 1 };
        assert!(err.to_string().contains("got 1"));
    }
}
