//! JSON text-frame codec for the recd control channel.
//!
//! Wire format: one JSON object per WebSocket text frame.

use crate::error::{RecdError, RecdResult};
use crate::messages::{ClientSignal, Notification, ServerEvent};

/// Anything a client can receive on a text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Per-connection lifecycle event.
    Event(ServerEvent),
    /// Broadcast notification.
    Notification(Notification),
}

/// Encode a serializable value into a text frame.
pub fn encode_frame<T: serde::Serialize>(value: &T) -> RecdResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a control signal sent by a client.
pub fn decode_signal(text: &str) -> RecdResult<ClientSignal> {
    serde_json::from_str(text)
        .map_err(|e| RecdError::InvalidMessage(format!("bad control signal: {e}")))
}

/// Decode a frame received by a client. Known lifecycle events win; any
/// other `{"event": ..}` object is treated as a broadcast notification.
pub fn decode_incoming(text: &str) -> RecdResult<Incoming> {
    if let Ok(event) = serde_json::from_str::<ServerEvent>(text) {
        return Ok(Incoming::Event(event));
    }
    let notification: Notification = serde_json::from_str(text)?;
    Ok(Incoming::Notification(notification))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::StopReason;
    use serde_json::json;

    #[test]
    fn decodes_lifecycle_event() {
        let frame = encode_frame(&ServerEvent::RecordingStarted {
            file: "audio.webm".into(),
        })
        .unwrap();
        assert_eq!(
            decode_incoming(&frame).unwrap(),
            Incoming::Event(ServerEvent::RecordingStarted {
                file: "audio.webm".into()
            })
        );
    }

    #[test]
    fn unknown_event_falls_back_to_notification() {
        let text = r#"{"event":"newUser","data":{"message":"New User Added."}}"#;
        match decode_incoming(text).unwrap() {
            Incoming::Notification(n) => {
                assert_eq!(n.event, "newUser");
                assert_eq!(n.data, json!({"message": "New User Added."}));
            }
            other => panic!("expected notification, got {other:?}"),
        }
    }

    #[test]
    fn malformed_stopped_event_is_not_misread() {
        // Missing fields: not a valid lifecycle event, but still a named object.
        let text = r#"{"event":"recording-stopped","data":{"file":"x"}}"#;
        assert!(matches!(
            decode_incoming(text).unwrap(),
            Incoming::Notification(_)
        ));
        let full = encode_frame(&ServerEvent::RecordingStopped {
            file: "x".into(),
            bytes: 1,
            chunks: 1,
            reason: StopReason::Requested,
            duration_ms: 0,
        })
        .unwrap();
        assert!(matches!(decode_incoming(&full).unwrap(), Incoming::Event(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_incoming("not json").is_err());
        assert!(matches!(
            decode_signal("{}"),
            Err(RecdError::InvalidMessage(_))
        ));
    }
}
