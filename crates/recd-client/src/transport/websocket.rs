//! WebSocket transport for the recd client.
//!
//! Control signals go out as text frames, recording chunks as binary
//! frames. Incoming text frames are events and notifications.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use recd_core::{RecdError, RecdResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connected WebSocket, split into its write and read halves.
pub struct WebSocketSession {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
    connected: bool,
}

impl WebSocketSession {
    /// Connect to a recd server over WebSocket.
    pub async fn connect(url: &str) -> RecdResult<Self> {
        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|e| RecdError::Transport(format!("WebSocket connect error: {e}")))?;

        tracing::info!("WebSocket connected to {}", url);

        let (sink, stream) = ws_stream.split();
        Ok(Self {
            sink,
            stream,
            connected: true,
        })
    }

    pub async fn send_text(&mut self, text: &str) -> RecdResult<()> {
        self.send(Message::Text(text.to_string().into())).await
    }

    pub async fn send_binary(&mut self, data: &[u8]) -> RecdResult<()> {
        self.send(Message::Binary(data.to_vec().into())).await
    }

    async fn send(&mut self, msg: Message) -> RecdResult<()> {
        self.sink
            .send(msg)
            .await
            .map_err(|e| RecdError::Transport(format!("WS send error: {e}")))
    }

    /// Receive the next text frame. Returns `None` once the server closes.
    pub async fn recv_text(&mut self) -> RecdResult<Option<String>> {
        while let Some(msg) = self.stream.next().await {
            match msg {
                Ok(Message::Text(text)) => return Ok(Some(text.to_string())),
                Ok(Message::Close(_)) => {
                    tracing::debug!("WebSocket close frame received");
                    break;
                }
                Ok(Message::Ping(payload)) => {
                    let _ = self.sink.send(Message::Pong(payload)).await;
                }
                Ok(_) => continue, // Binary frames, pongs
                Err(e) => {
                    self.connected = false;
                    return Err(RecdError::Transport(format!("WS recv error: {e}")));
                }
            }
        }
        self.connected = false;
        Ok(None)
    }

    /// Send a close frame and stop using the connection.
    pub async fn close(&mut self) -> RecdResult<()> {
        if self.connected {
            self.connected = false;
            let _ = self.sink.send(Message::Close(None)).await;
        }
        Ok(())
    }
}
