//! WebSocket listener using tokio-tungstenite.
//!
//! Text frames carry JSON control signals and events; binary frames carry
//! recorded audio chunks.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};
use recd_core::{RecdError, RecdResult};

/// A handle to an accepted WebSocket connection.
pub struct WebSocketConnection {
    pub ws_stream: WebSocketStream<TcpStream>,
    pub remote_addr: SocketAddr,
}

/// One inbound application frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// JSON control signal.
    Control(String),
    /// Raw recording bytes.
    Data(Vec<u8>),
}

/// Bind the TCP socket the WebSocket listener will accept on.
pub async fn bind(addr: SocketAddr) -> RecdResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| RecdError::Transport(format!("WS bind failed on {addr}: {e}")))
}

/// Start accepting WebSocket connections on `tcp_listener`.
///
/// Returns a receiver that yields upgraded connections. The accept loop
/// stops once the receiver is dropped.
pub fn start_listener(tcp_listener: TcpListener) -> mpsc::Receiver<WebSocketConnection> {
    if let Ok(addr) = tcp_listener.local_addr() {
        info!(addr = %addr, "WebSocket listener started");
    }

    let (tx, rx) = mpsc::channel::<WebSocketConnection>(64);

    tokio::spawn(async move {
        loop {
            let accepted = tokio::select! {
                _ = tx.closed() => break,
                accepted = tcp_listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, addr)) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        match tokio_tungstenite::accept_async(stream).await {
                            Ok(ws_stream) => {
                                debug!(remote = %addr, "WebSocket connection accepted");
                                let conn = WebSocketConnection {
                                    ws_stream,
                                    remote_addr: addr,
                                };
                                if tx.send(conn).await.is_err() {
                                    warn!("WebSocket connection channel closed");
                                }
                            }
                            Err(e) => {
                                warn!(remote = %addr, error = %e, "WebSocket handshake failed");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "TCP accept failed");
                }
            }
        }
        debug!("WebSocket accept loop stopped");
    });

    rx
}

/// Helper: send a text message over a WebSocket.
pub async fn ws_send_text(ws: &mut WebSocketStream<TcpStream>, text: &str) -> RecdResult<()> {
    ws.send(Message::Text(text.to_string().into()))
        .await
        .map_err(|e| RecdError::Transport(format!("WS send failed: {e}")))
}

/// Helper: send a close frame. Errors are ignored; the peer may be gone.
pub async fn ws_close(ws: &mut WebSocketStream<TcpStream>, reason: &str) {
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: reason.to_string().into(),
    };
    let _ = ws.send(Message::Close(Some(frame))).await;
}

/// Helper: receive the next application frame from a WebSocket.
///
/// Returns `None` if the connection is closed. Pings are answered inline.
/// Frames larger than `max_frame_bytes` yield `InvalidMessage`; the
/// connection remains usable.
pub async fn ws_recv_frame(
    ws: &mut WebSocketStream<TcpStream>,
    max_frame_bytes: usize,
) -> RecdResult<Option<Frame>> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Binary(data))) => {
                if data.len() > max_frame_bytes {
                    return Err(RecdError::InvalidMessage(format!(
                        "WS frame too large: {} bytes (max {max_frame_bytes})",
                        data.len()
                    )));
                }
                return Ok(Some(Frame::Data(data.to_vec())));
            }
            Some(Ok(Message::Text(text))) => {
                if text.len() > max_frame_bytes {
                    return Err(RecdError::InvalidMessage(format!(
                        "WS frame too large: {} bytes (max {max_frame_bytes})",
                        text.len()
                    )));
                }
                return Ok(Some(Frame::Control(text.to_string())));
            }
            Some(Ok(Message::Close(_))) => return Ok(None),
            Some(Ok(Message::Ping(payload))) => {
                ws.send(Message::Pong(payload))
                    .await
                    .map_err(|e| RecdError::Transport(format!("WS pong failed: {e}")))?;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                return Err(RecdError::Transport(format!("WS recv failed: {e}")));
            }
            None => return Ok(None),
        }
    }
}
