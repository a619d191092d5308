use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Custom Result type for scrub operations.
pub type Result<T> = StdResult<T, ScrubError>;

/// Scrub-specific error types.
///
/// Every message carried by these variants has already been passed through
/// [`Credential::sanitize`](crate::Credential::sanitize) when it was derived
/// from subprocess output.
#[derive(Error, Debug)]
pub enum ScrubError {
    /// The credential was rejected by the remote.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A repository or commit could not be found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Commit ancestry could not be computed, so safety cannot be judged.
    #[error("Ancestry error: {0}")]
    Ancestry(String),

    /// The requested deletion would destroy commits outside the candidate set.
    #[error("Unsafe operation: {0}")]
    UnsafeOperation(String),

    /// A subprocess timed out or hit a network blip.
    #[error("Transient command failure: {0}")]
    TransientCommand(String),

    /// The remote refused the history update (moved branch, protection rules).
    #[error("Publish rejected: {0}")]
    PublishConflict(String),

    /// A git command failed for a reason not covered by a more specific variant.
    #[error("Git command failed: {command}\nError: {message}")]
    Command {
        /// The command line, with credentials redacted.
        command: String,
        /// Sanitized stderr of the failing command.
        message: String,
    },

    /// The git executable could not be started.
    #[error("git is not installed or not in PATH: {0}")]
    GitUnavailable(String),

    /// Input records failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An underlying I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrubError {
    /// Return the recommended process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnsafeOperation(_) => 2,
            Self::Authentication(_) => 3,
            Self::NotFound(_) => 4,
            Self::Ancestry(_) => 5,
            Self::PublishConflict(_) => 6,
            Self::GitUnavailable(_) => 127,
            Self::InvalidInput(_) | Self::Json(_) => 65,
            Self::TransientCommand(_) => 75,
            _ => 1,
        }
    }
}
