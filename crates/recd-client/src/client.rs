//! High-level recording client.

use crate::transport::{validate_url, WebSocketSession};
use recd_core::{
    decode_incoming, encode_frame, ClientSignal, ConnectionId, Incoming, Notification, RecdError,
    RecdResult, ServerEvent, StopReason,
};
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

/// Default size of chunks read from a local source.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// A recording the server has finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRecording {
    pub file: String,
    pub bytes: u64,
    pub chunks: u64,
    pub reason: StopReason,
    pub duration_ms: u64,
}

/// A connection to a recd server.
pub struct RecorderClient {
    transport: WebSocketSession,
    connection_id: ConnectionId,
    /// Notifications seen while waiting for a lifecycle event.
    pending: VecDeque<Notification>,
}

impl RecorderClient {
    /// Connect and wait for the server's `connected` event.
    pub async fn connect(url: &str) -> RecdResult<Self> {
        validate_url(url)?;
        let mut transport = WebSocketSession::connect(url).await?;

        let connection_id = loop {
            let text = transport
                .recv_text()
                .await?
                .ok_or_else(|| RecdError::Transport("connection closed before handshake".into()))?;
            match decode_incoming(&text)? {
                Incoming::Event(ServerEvent::Connected { connection_id }) => break connection_id,
                other => debug!(?other, "ignoring frame before connected"),
            }
        };
        info!(connection = %connection_id, "recording connection ready");

        Ok(Self {
            transport,
            connection_id,
            pending: VecDeque::new(),
        })
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    /// Ask the server to open a new recording.
    pub async fn start(&mut self) -> RecdResult<()> {
        self.send_signal(ClientSignal::StartRecording).await
    }

    /// Ask the server to finalize the current recording.
    pub async fn stop(&mut self) -> RecdResult<()> {
        self.send_signal(ClientSignal::StopRecording).await
    }

    /// Send one chunk of recording bytes.
    pub async fn send_chunk(&mut self, chunk: &[u8]) -> RecdResult<()> {
        self.transport.send_binary(chunk).await
    }

    /// Next event or notification, or `None` once the server closes.
    pub async fn next_incoming(&mut self) -> RecdResult<Option<Incoming>> {
        if let Some(notification) = self.pending.pop_front() {
            return Ok(Some(Incoming::Notification(notification)));
        }
        match self.transport.recv_text().await? {
            Some(text) => Ok(Some(decode_incoming(&text)?)),
            None => Ok(None),
        }
    }

    /// Wait for `recording-started` and return the server-side file name.
    pub async fn wait_for_started(&mut self) -> RecdResult<String> {
        loop {
            match self.next_event().await? {
                ServerEvent::RecordingStarted { file } => return Ok(file),
                other => debug!(?other, "waiting for recording-started"),
            }
        }
    }

    /// Wait for `recording-stopped`.
    pub async fn wait_for_stopped(&mut self) -> RecdResult<SavedRecording> {
        loop {
            match self.next_event().await? {
                ServerEvent::RecordingStopped {
                    file,
                    bytes,
                    chunks,
                    reason,
                    duration_ms,
                } => {
                    return Ok(SavedRecording {
                        file,
                        bytes,
                        chunks,
                        reason,
                        duration_ms,
                    })
                }
                other => debug!(?other, "waiting for recording-stopped"),
            }
        }
    }

    /// Stream everything `reader` yields as one recording.
    pub async fn record_from<R>(&mut self, reader: &mut R, chunk_size: usize) -> RecdResult<SavedRecording>
    where
        R: AsyncRead + Unpin,
    {
        self.start().await?;
        let file = self.wait_for_started().await?;
        debug!(file = %file, "streaming recording");

        let mut buf = vec![0u8; chunk_size.max(1)];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            self.send_chunk(&buf[..n]).await?;
        }

        self.stop().await?;
        self.wait_for_stopped().await
    }

    /// Close the connection.
    pub async fn close(mut self) -> RecdResult<()> {
        self.transport.close().await
    }

    async fn send_signal(&mut self, signal: ClientSignal) -> RecdResult<()> {
        let text = encode_frame(&signal)?;
        self.transport.send_text(&text).await
    }

    /// Next lifecycle event. Notifications are queued for `next_incoming`;
    /// `recording-error` becomes [`RecdError::Rejected`].
    async fn next_event(&mut self) -> RecdResult<ServerEvent> {
        loop {
            let text = self
                .transport
                .recv_text()
                .await?
                .ok_or_else(|| RecdError::Transport("connection closed".into()))?;
            match decode_incoming(&text)? {
                Incoming::Event(ServerEvent::RecordingError { kind, message }) => {
                    return Err(RecdError::Rejected { kind, message });
                }
                Incoming::Event(event) => return Ok(event),
                Incoming::Notification(n) => self.pending.push_back(n),
            }
        }
    }
}
