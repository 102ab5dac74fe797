//! Wire messages exchanged over the recording WebSocket.
//!
//! Control signals and events travel as JSON text frames shaped like
//! `{"event": "<name>", "data": {...}}`. Recorded audio travels as raw
//! binary frames and never passes through this module.

use crate::connection::ConnectionId;
use serde::{Deserialize, Serialize};

/// Control signals a client sends to drive its recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientSignal {
    StartRecording,
    StopRecording,
}

/// Why a recording was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// Client sent `stop-recording`.
    Requested,
    /// Connection went away while recording.
    Disconnected,
}

/// Classification of non-fatal recording diagnostics reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordingErrorKind {
    InvalidSequence,
    ResourceUnavailable,
    DuplicateStart,
    UnknownConnection,
    InvalidMessage,
}

/// Events the server sends to a single connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// First event on every connection.
    Connected { connection_id: ConnectionId },
    /// A new output file was opened.
    RecordingStarted { file: String },
    /// The output file was flushed and closed.
    RecordingStopped {
        file: String,
        bytes: u64,
        chunks: u64,
        reason: StopReason,
        duration_ms: u64,
    },
    /// A signal could not be applied. The connection stays open.
    RecordingError {
        kind: RecordingErrorKind,
        message: String,
    },
}

/// A named event fanned out to every connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Notification {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signal_wire_names() {
        let start: ClientSignal = serde_json::from_str(r#"{"event":"start-recording"}"#).unwrap();
        assert_eq!(start, ClientSignal::StartRecording);
        let stop: ClientSignal = serde_json::from_str(r#"{"event":"stop-recording"}"#).unwrap();
        assert_eq!(stop, ClientSignal::StopRecording);
    }

    #[test]
    fn data_chunk_is_not_a_text_signal() {
        assert!(serde_json::from_str::<ClientSignal>(r#"{"event":"data-chunk"}"#).is_err());
    }

    #[test]
    fn stopped_event_shape() {
        let event = ServerEvent::RecordingStopped {
            file: "audio_1_ab-1.webm".into(),
            bytes: 3,
            chunks: 2,
            reason: StopReason::Disconnected,
            duration_ms: 10,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "recording-stopped",
                "data": {
                    "file": "audio_1_ab-1.webm",
                    "bytes": 3,
                    "chunks": 2,
                    "reason": "disconnected",
                    "durationMs": 10
                }
            })
        );
    }

    #[test]
    fn connected_event_shape() {
        let event = ServerEvent::Connected {
            connection_id: ConnectionId::from("0123456789abcdef"),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "connected", "data": {"connectionId": "0123456789abcdef"}})
        );
    }

    #[test]
    fn error_kind_wire_name() {
        let event = ServerEvent::RecordingError {
            kind: RecordingErrorKind::InvalidSequence,
            message: "no active recording".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["data"]["kind"], "invalid-sequence");
    }
}
