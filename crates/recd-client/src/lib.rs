//! recd-client: Rust client library for the recording server.
//!
//! Connects over WebSocket, drives the start / data / stop signal sequence,
//! and reports the events the server sends back.
//!
//! # Quick Start
//!
//! ```no_run
//! use recd_client::RecorderClient;
//!
//! # async fn example() -> recd_core::RecdResult<()> {
//! let mut client = RecorderClient::connect("ws://127.0.0.1:5000").await?;
//!
//! client.start().await?;
//! let file = client.wait_for_started().await?;
//! client.send_chunk(&[0x1a, 0x45, 0xdf, 0xa3]).await?;
//! client.stop().await?;
//!
//! let saved = client.wait_for_stopped().await?;
//! println!("{file}: {} bytes", saved.bytes);
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod transport;

// Re-export primary public types.
pub use client::{RecorderClient, SavedRecording, DEFAULT_CHUNK_SIZE};
pub use transport::WebSocketSession;

// Re-export recd-core types for convenience.
pub use recd_core::{Incoming, Notification, RecdError, RecdResult, ServerEvent};
