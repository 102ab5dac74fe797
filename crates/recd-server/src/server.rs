//! Core server: accepts connections and drives their recording sessions.
//!
//! Owns the session manager and the notification broadcaster, and
//! coordinates the lifecycle of all incoming connections, including
//! finalizing open recordings on shutdown.

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::recording::session::display_name;
use crate::recording::{
    DirectoryStore, NamingScheme, Outcome, RecordingError, SessionManager, SessionState,
};
use crate::transport::websocket::{self, Frame, WebSocketConnection};
use recd_core::{
    decode_signal, encode_frame, ClientSignal, ConnectionId, RecdError, RecdResult,
    RecordingErrorKind, ServerEvent,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

/// The recording server instance.
pub struct RecdServer {
    config: ServerConfig,
    sessions: Arc<SessionManager>,
    broadcaster: Broadcaster,
    /// Flips to `true` once; connection loops that subscribe late still see it.
    shutdown_tx: watch::Sender<bool>,
}

impl RecdServer {
    /// Create a new server instance, creating the recordings directory.
    pub async fn new(config: ServerConfig) -> RecdResult<Self> {
        let store = DirectoryStore::new(&config.recordings_dir);
        store.ensure_dir().await.map_err(|e| {
            RecdError::Config(format!(
                "cannot create recordings dir {}: {e}",
                config.recordings_dir.display()
            ))
        })?;
        info!(dir = %store.root().display(), "recordings directory ready");

        let naming = NamingScheme {
            prefix: config.file_prefix.clone(),
            extension: config.file_extension.clone(),
        };
        let sessions = Arc::new(SessionManager::new(
            Arc::new(store),
            naming,
            config.max_connections,
        ));
        let broadcaster = Broadcaster::new(config.notification_capacity);

        Ok(Self {
            config,
            sessions,
            broadcaster,
            shutdown_tx: watch::channel(false).0,
        })
    }

    /// Serve connections from `listener` until `shutdown` resolves, then
    /// finalize every open recording before returning.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> RecdResult<()> {
        let server = Arc::new(self);
        let mut ws_rx = websocket::start_listener(listener);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        info!(
            max_connections = server.config.max_connections,
            "recd-server ready"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                conn = ws_rx.recv() => {
                    let Some(conn) = conn else {
                        warn!("WebSocket listener stopped");
                        break;
                    };
                    let srv = server.clone();
                    connections.spawn(async move {
                        if let Err(e) = srv.handle_websocket(conn).await {
                            warn!(error = %e, "WebSocket connection error");
                        }
                    });
                }
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "connection task failed");
                    }
                }
            }
        }

        // Stop accepting, then let every connection finalize its recording.
        drop(ws_rx);
        for session in server.sessions.list().await {
            if session.state == SessionState::Recording {
                info!(
                    connection = %session.connection_id,
                    file = ?session.file,
                    bytes = session.bytes,
                    connected_since = %session.created_at,
                    connected_secs = session.connected_secs,
                    "finalizing recording for shutdown"
                );
            }
        }
        server.shutdown_tx.send_replace(true);

        let grace = Duration::from_secs(server.config.shutdown_grace);
        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = connections.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "connection task failed during shutdown");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = connections.len(),
                "connections still open after grace period, aborting"
            );
            connections.abort_all();
            while connections.join_next().await.is_some() {}
        }
        server.finalize_remaining().await;

        Ok(())
    }

    /// Finalize sessions whose connection task never reached its own
    /// disconnect, e.g. tasks aborted after the grace period.
    async fn finalize_remaining(&self) {
        for session in self.sessions.list().await {
            let id = session.connection_id;
            match self.sessions.on_disconnect(&id).await {
                Ok(Outcome::Stopped(summary)) => info!(
                    connection = %id,
                    file = %summary.file_name(),
                    bytes = summary.bytes,
                    "recording finalized after shutdown"
                ),
                Ok(_) => {}
                Err(e) => warn!(connection = %id, error = %e, "failed to finalize recording"),
            }
        }
    }

    /// Handle one WebSocket connection from accept to close.
    async fn handle_websocket(&self, mut conn: WebSocketConnection) -> RecdResult<()> {
        let remote = conn.remote_addr;
        let id = match self.sessions.connect().await {
            Ok(id) => id,
            Err(e) => {
                warn!(remote = %remote, error = %e, "connection refused");
                websocket::ws_close(&mut conn.ws_stream, "server busy").await;
                return Err(e);
            }
        };
        let live = self.sessions.count().await;
        info!(connection = %id, remote = %remote, live, "client connected");

        let result = self.connection_loop(&mut conn, &id).await;

        // Every exit path ends here, so an open recording is always finalized.
        let outcome = self.sessions.on_disconnect(&id).await;
        if let Err(e) = self.report(&mut conn, &id, outcome).await {
            debug!(connection = %id, error = %e, "final outcome not delivered");
        }
        websocket::ws_close(&mut conn.ws_stream, "bye").await;
        info!(connection = %id, "client disconnected");

        result
    }

    /// Post-connect message loop.
    async fn connection_loop(
        &self,
        conn: &mut WebSocketConnection,
        id: &ConnectionId,
    ) -> RecdResult<()> {
        let mut notifications = self.broadcaster.subscribe();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        self.send_event(
            conn,
            &ServerEvent::Connected {
                connection_id: id.clone(),
            },
        )
        .await?;

        loop {
            tokio::select! {
                _ = async { let _ = shutdown_rx.wait_for(|stopping| *stopping).await; } => {
                    debug!(connection = %id, "shutdown signal received, closing connection");
                    break;
                }

                notification = notifications.recv() => match notification {
                    Ok(notification) => {
                        let text = encode_frame(&notification)?;
                        websocket::ws_send_text(&mut conn.ws_stream, &text).await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(connection = %id, skipped, "client lagging, notifications dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },

                frame = websocket::ws_recv_frame(&mut conn.ws_stream, self.config.max_frame_bytes) => {
                    match frame {
                        Ok(Some(Frame::Control(text))) => match decode_signal(&text) {
                            Ok(ClientSignal::StartRecording) => {
                                let outcome = self.sessions.on_start(id).await;
                                self.report(conn, id, outcome).await?;
                            }
                            Ok(ClientSignal::StopRecording) => {
                                let outcome = self.sessions.on_stop(id).await;
                                self.report(conn, id, outcome).await?;
                            }
                            Err(e) => self.reject(conn, id, e).await?,
                        },
                        Ok(Some(Frame::Data(chunk))) => {
                            let outcome = self.sessions.on_data(id, chunk).await;
                            self.report(conn, id, outcome).await?;
                        }
                        Ok(None) => {
                            debug!(connection = %id, "WebSocket closed by peer");
                            break;
                        }
                        Err(e @ RecdError::InvalidMessage(_)) => self.reject(conn, id, e).await?,
                        Err(e) => {
                            debug!(connection = %id, error = %e, "WebSocket session ended");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Turn a session outcome into events for the client (and everyone else
    /// when a recording is saved).
    async fn report(
        &self,
        conn: &mut WebSocketConnection,
        id: &ConnectionId,
        outcome: Result<Outcome, RecordingError>,
    ) -> RecdResult<()> {
        match outcome {
            Ok(Outcome::Started { file }) => {
                self.send_event(
                    conn,
                    &ServerEvent::RecordingStarted {
                        file: display_name(&file),
                    },
                )
                .await
            }
            Ok(Outcome::Stopped(summary)) => {
                let file = summary.file_name();
                self.broadcaster.broadcast(
                    "recording-saved",
                    json!({
                        "connectionId": id,
                        "file": file,
                        "bytes": summary.bytes,
                    }),
                );
                self.send_event(
                    conn,
                    &ServerEvent::RecordingStopped {
                        file,
                        bytes: summary.bytes,
                        chunks: summary.chunks,
                        reason: summary.reason,
                        duration_ms: summary.duration.as_millis() as u64,
                    },
                )
                .await
            }
            Ok(Outcome::Appended { bytes }) => {
                trace!(connection = %id, bytes, "chunk appended");
                Ok(())
            }
            Ok(Outcome::Unchanged) => Ok(()),
            Err(e) => {
                self.send_event(
                    conn,
                    &ServerEvent::RecordingError {
                        kind: e.kind(),
                        message: e.to_string(),
                    },
                )
                .await
            }
        }
    }

    /// Report a frame that could not be understood. The connection stays open.
    async fn reject(
        &self,
        conn: &mut WebSocketConnection,
        id: &ConnectionId,
        error: RecdError,
    ) -> RecdResult<()> {
        warn!(connection = %id, error = %error, "rejected inbound frame");
        self.send_event(
            conn,
            &ServerEvent::RecordingError {
                kind: RecordingErrorKind::InvalidMessage,
                message: error.to_string(),
            },
        )
        .await
    }

    async fn send_event(&self, conn: &mut WebSocketConnection, event: &ServerEvent) -> RecdResult<()> {
        let text = encode_frame(event)?;
        websocket::ws_send_text(&mut conn.ws_stream, &text).await
    }
}
