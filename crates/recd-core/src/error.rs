use crate::messages::RecordingErrorKind;
use thiserror::Error;

/// Errors produced by the recd protocol layer.
#[derive(Debug, Error)]
pub enum RecdError {
    #[error("codec error: {0}")]
    Codec(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("connection limit reached ({0})")]
    ConnectionLimit(usize),

    #[error("server rejected request ({kind:?}): {message}")]
    Rejected {
        kind: RecordingErrorKind,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for RecdError {
    fn from(e: serde_json::Error) -> Self {
        RecdError::Codec(e.to_string())
    }
}

pub type RecdResult<T> = Result<T, RecdError>;
