use drsite_core::CoreError;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The resource or its API does not exist in the project yet
    #[error("Not found: {command}: {message}")]
    NotFound { command: String, message: String },

    #[error("Permission denied: {command}: {message}")]
    PermissionDenied { command: String, message: String },

    /// Quota, throttling or server-side failure worth retrying
    #[error("Transient failure: {command}: {message}")]
    Transient { command: String, message: String },

    #[error("Timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },

    #[error("Command failed: {command}: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed {what}: {message}")]
    Malformed { what: String, message: String },

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<DiscoveryError>,
    },

    #[error("Invalid firewall name filter: {0}")]
    InvalidFilter(#[from] regex::Error),

    #[error(transparent)]
    Inventory(#[from] CoreError),
}

impl DiscoveryError {
    /// Errors another attempt may fix
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DiscoveryError::Transient { .. } | DiscoveryError::Timeout { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DiscoveryError::NotFound { .. })
    }
}

/// Classify a failed gcloud invocation from its stderr.
///
/// Disabled APIs are reported by GCP as 403 with `SERVICE_DISABLED`, so
/// not-found markers are checked before permission markers.
pub fn classify_failure(command: &str, stderr: &str) -> DiscoveryError {
    let message = stderr.trim().to_string();
    let command = command.to_string();
    let lowered = stderr.to_ascii_lowercase();
    let tokens: Vec<&str> = stderr
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .collect();
    let has_token = |candidates: &[&str]| tokens.iter().any(|t| candidates.contains(t));

    if has_token(&["NOT_FOUND", "SERVICE_DISABLED", "404"])
        || lowered.contains("was not found")
        || lowered.contains("has not been used in project")
        || lowered.contains("is not enabled")
    {
        DiscoveryError::NotFound { command, message }
    } else if has_token(&["PERMISSION_DENIED", "UNAUTHENTICATED", "401", "403"])
        || lowered.contains("does not have permission")
        || lowered.contains("gcloud auth login")
    {
        DiscoveryError::PermissionDenied { command, message }
    } else if has_token(&[
        "RESOURCE_EXHAUSTED",
        "UNAVAILABLE",
        "INTERNAL",
        "DEADLINE_EXCEEDED",
        "429",
        "500",
        "502",
        "503",
        "504",
    ]) || lowered.contains("rate limit")
        || lowered.contains("quota exceeded")
    {
        DiscoveryError::Transient { command, message }
    } else {
        DiscoveryError::CommandFailed { command, message }
    }
}
