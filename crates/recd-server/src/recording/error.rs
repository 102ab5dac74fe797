use recd_core::{ConnectionId, RecordingErrorKind};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Non-fatal conditions raised while applying a signal to a session.
///
/// None of these terminate the connection; callers log them and report
/// them to the client.
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("invalid sequence: {0}")]
    InvalidSequence(&'static str),

    #[error("recording already active: {}", file.display())]
    DuplicateStart { file: PathBuf },

    #[error("output unavailable ({}): {source}", path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),
}

impl RecordingError {
    /// Wire classification for `recording-error` events.
    pub fn kind(&self) -> RecordingErrorKind {
        match self {
            Self::InvalidSequence(_) => RecordingErrorKind::InvalidSequence,
            Self::DuplicateStart { .. } => RecordingErrorKind::DuplicateStart,
            Self::ResourceUnavailable { .. } => RecordingErrorKind::ResourceUnavailable,
            Self::UnknownConnection(_) => RecordingErrorKind::UnknownConnection,
        }
    }
}
