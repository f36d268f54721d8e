use provider_subsonic::AuthError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Credential construction failed; the whole batch is aborted
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),
}

/// Failure of a pooled unit of work itself, as opposed to its outcome
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("Worker panicked: {0}")]
    Panicked(String),

    #[error("Worker task lost before completing")]
    Lost,
}

pub type Result<T> = std::result::Result<T, SyncError>;
