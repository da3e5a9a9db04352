use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StampError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Auth(String),
    /// Message from the provider (or transport), surfaced verbatim.
    #[error("{0}")]
    Upstream(String),
    #[error("could not read image {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("history storage is corrupt: {0}")]
    StorageParse(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("a generation is already in progress")]
    Busy,
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("clipboard error: {0}")]
    Clipboard(String),
}

impl StampError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StampError::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that leave the processing state untouched when raised by a submit.
    pub fn is_rejection(&self) -> bool {
        matches!(self, StampError::Validation(_) | StampError::Busy)
    }
}

impl From<serde_json::Error> for StampError {
    fn from(e: serde_json::Error) -> Self {
        StampError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StampError>;
