//! Transport layer for the recd client.
//!
//! Only WebSocket is supported: `ws://` or `wss://` URLs.

pub mod websocket;

pub use websocket::WebSocketSession;

use recd_core::{RecdError, RecdResult};

/// Check that `url` uses a WebSocket scheme.
pub fn validate_url(url: &str) -> RecdResult<()> {
    let lower = url.to_lowercase();
    if lower.starts_with("ws://") || lower.starts_with("wss://") {
        Ok(())
    } else {
        Err(RecdError::Transport(format!(
            "unsupported URL scheme: {url} (expected ws:// or wss://)"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_websocket_schemes() {
        assert!(validate_url("ws://localhost:5000").is_ok());
        assert!(validate_url("WSS://example.com/rec").is_ok());
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(validate_url("http://example.com").is_err());
        assert!(validate_url("localhost:5000").is_err());
    }
}
