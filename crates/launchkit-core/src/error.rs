use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures of the optional AI capability. Every one of these has a degraded
/// fallback; none of them should end a wizard run.
#[derive(Debug, Error)]
pub enum AssistError {
    #[error("the claude CLI is not available")]
    Unavailable,

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("{0}")]
    Failed(String),

    #[error("response was not valid JSON: {0}")]
    Unparseable(String),
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Assist(#[from] AssistError),

    #[error("output directory already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("cannot create output directory {}: {source}", path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown setting '{0}'")]
    UnknownSetting(String),

    #[error("invalid value for '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("cancelled")]
    Cancelled,

    #[error("input closed before the wizard finished")]
    InputClosed,

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LaunchError {
    /// Optional-capability errors degrade the run; everything else aborts it.
    pub fn is_optional(&self) -> bool {
        matches!(self, LaunchError::Assist(_))
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_assist_errors_are_optional() {
        assert!(LaunchError::from(AssistError::Unavailable).is_optional());
        assert!(LaunchError::from(AssistError::Timeout(Duration::from_secs(3))).is_optional());
        assert!(!LaunchError::OutputExists(PathBuf::from("/tmp/x")).is_optional());
        assert!(!LaunchError::Cancelled.is_optional());
    }

    #[test]
    fn timeout_message_is_in_seconds() {
        let e = AssistError::Timeout(Duration::from_millis(180_000));
        assert_eq!(e.to_string(), "timed out after 180s");
    }
}
