//! recd-core: Shared protocol library for the recording server.
//!
//! Provides the JSON control signals and server events exchanged over the
//! WebSocket, the text-frame codec, connection identifiers, and the common
//! error type.

pub mod codec;
pub mod connection;
pub mod error;
pub mod messages;

// Re-export commonly used items at crate root.
pub use codec::{decode_incoming, decode_signal, encode_frame, Incoming};
pub use connection::ConnectionId;
pub use error::{RecdError, RecdResult};
pub use messages::{ClientSignal, Notification, RecordingErrorKind, ServerEvent, StopReason};
