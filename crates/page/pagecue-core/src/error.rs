//! Error types for pagecue.
//!
//! Only configuration and input parsing can fail. Runtime operations against
//! the document swallow missing targets and invalid values at the point of
//! detection, so nothing here is produced by `advance` or event handling.

/// Errors raised while parsing selectors, observer options or configuration.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum CueError {
    /// Selector outside the supported CSS subset, or malformed.
    #[error("invalid selector `{input}`: {reason}")]
    Selector { input: String, reason: String },

    /// Root margin that is not a CSS margin shorthand of px/% lengths.
    #[error("invalid root margin `{input}`: {reason}")]
    RootMargin { input: String, reason: String },

    /// Visibility threshold outside [0, 1] or not finite.
    #[error("threshold {value} is outside [0, 1]")]
    Threshold { value: f64 },

    /// Configuration document failed to parse.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CueError>;

impl CueError {
    pub(crate) fn selector(input: &str, reason: impl Into<String>) -> Self {
        CueError::Selector {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn root_margin(input: &str, reason: impl Into<String>) -> Self {
        CueError::RootMargin {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
