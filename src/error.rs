use std::time::Duration;

/// Errors of the login rendezvous.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("State mismatch: {received} != {expected}")]
    StateMismatch { expected: String, received: String },
    #[error("Couldn't get token: {0}")]
    ExchangeFailed(String),
    #[error("An authenticated client was already delivered for this login")]
    AlreadyDelivered,
    #[error("The authenticated client was already awaited")]
    AlreadyAwaited,
    #[error("Login was not completed within {0:?}")]
    TimedOut(Duration),
    #[error("Nobody is waiting for the authenticated client")]
    ConsumerGone,
}

/// A failed call against the remote API.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        Self {
            status: error.status().map(|status| status.as_u16()),
            message: error.to_string(),
        }
    }
}

/// Errors while collecting a track set. Any of these aborts the whole collection.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to fetch page: {0}")]
    TransientFetch(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Remote returned an empty page after {collected} of {total} items")]
    Truncated { collected: usize, total: usize },
    #[error("Collection cancelled")]
    Cancelled,
}

impl From<RemoteError> for FetchError {
    fn from(error: RemoteError) -> Self {
        match error.status {
            Some(404) => Self::NotFound(error.message),
            Some(401 | 403) => Self::Unauthorized(error.message),
            _ => Self::TransientFetch(error.message),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to access snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to replace snapshot: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("Corrupt snapshot at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
}

/// Errors while writing a track set back. The write stops at the failed chunk.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Remote write failed at chunk {chunk}: {source}")]
    RemoteWrite {
        chunk: usize,
        #[source]
        source: RemoteError,
    },
    #[error("Write-back cancelled after {completed_chunks} chunks")]
    Cancelled { completed_chunks: usize },
}
