//! Per-connection recording state machine.
//!
//! A [`RecordingSession`] is either idle or recording into exactly one
//! output. Every inbound signal goes through [`RecordingSession::handle`],
//! which holds the whole Idle/Recording transition table.

use super::error::RecordingError;
use super::output::{OutputSink, OutputStore};
use chrono::{DateTime, Utc};
use recd_core::{ConnectionId, StopReason};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// An inbound signal from a client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Start,
    Data(Vec<u8>),
    Stop,
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
}

/// Result of applying a signal.
#[derive(Debug)]
pub enum Outcome {
    /// A new output was opened.
    Started { file: PathBuf },
    /// A chunk was appended; `bytes` is the running total.
    Appended { bytes: u64 },
    /// The output was flushed and released.
    Stopped(RecordingSummary),
    /// Nothing to do (stop while idle, empty chunk).
    Unchanged,
}

/// What a finalized recording contains.
#[derive(Debug, Clone)]
pub struct RecordingSummary {
    pub file: PathBuf,
    pub bytes: u64,
    pub chunks: u64,
    pub reason: StopReason,
    pub duration: Duration,
}

impl RecordingSummary {
    /// File name without the directory, as reported to clients.
    pub fn file_name(&self) -> String {
        display_name(&self.file)
    }
}

/// Snapshot of a live session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub connection_id: ConnectionId,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub connected_secs: u64,
    pub file: Option<PathBuf>,
    pub bytes: u64,
}

/// How recording files are named: `<prefix>_<unix ms>_<connection>-<seq>.<ext>`.
#[derive(Debug, Clone)]
pub struct NamingScheme {
    pub prefix: String,
    pub extension: String,
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            prefix: "audio".to_string(),
            extension: "webm".to_string(),
        }
    }
}

impl NamingScheme {
    pub fn file_name(
        &self,
        connection_id: &ConnectionId,
        sequence: u64,
        at: DateTime<Utc>,
    ) -> String {
        format!(
            "{}_{}_{}-{}.{}",
            self.prefix,
            at.timestamp_millis(),
            connection_id,
            sequence,
            self.extension
        )
    }
}

/// The output currently being written.
struct ActiveRecording {
    file: PathBuf,
    sink: Box<dyn OutputSink>,
    bytes: u64,
    chunks: u64,
    started_at: Instant,
}

impl ActiveRecording {
    /// Flush and release the sink. The sink is dropped on every path.
    async fn finish(mut self, reason: StopReason) -> std::io::Result<RecordingSummary> {
        self.sink.finish().await?;
        Ok(RecordingSummary {
            file: self.file,
            bytes: self.bytes,
            chunks: self.chunks,
            reason,
            duration: self.started_at.elapsed(),
        })
    }
}

/// Recording state for one connection.
pub struct RecordingSession {
    connection_id: ConnectionId,
    created_at: DateTime<Utc>,
    connected_at: Instant,
    store: Arc<dyn OutputStore>,
    naming: NamingScheme,
    active: Option<ActiveRecording>,
    /// Recordings started so far; part of each file name.
    sequence: u64,
    /// Set once the connection is gone; later starts are refused.
    closed: bool,
}

impl RecordingSession {
    pub fn new(
        connection_id: ConnectionId,
        store: Arc<dyn OutputStore>,
        naming: NamingScheme,
    ) -> Self {
        Self {
            connection_id,
            created_at: Utc::now(),
            connected_at: Instant::now(),
            store,
            naming,
            active: None,
            sequence: 0,
            closed: false,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.active.is_some() {
            SessionState::Recording
        } else {
            SessionState::Idle
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            connection_id: self.connection_id.clone(),
            state: self.state(),
            created_at: self.created_at,
            connected_secs: self.connected_at.elapsed().as_secs(),
            file: self.active.as_ref().map(|a| a.file.clone()),
            bytes: self.active.as_ref().map_or(0, |a| a.bytes),
        }
    }

    /// Apply one signal.
    pub async fn handle(&mut self, signal: Signal) -> Result<Outcome, RecordingError> {
        match signal {
            Signal::Start => self.start().await,
            Signal::Data(chunk) => self.append(&chunk).await,
            Signal::Stop => self.stop(StopReason::Requested).await,
            Signal::Disconnect => {
                self.closed = true;
                self.stop(StopReason::Disconnected).await
            }
        }
    }

    async fn start(&mut self) -> Result<Outcome, RecordingError> {
        if self.closed {
            return Err(RecordingError::InvalidSequence("start after disconnect"));
        }
        if let Some(active) = &self.active {
            warn!(
                connection = %self.connection_id,
                file = %active.file.display(),
                "start while already recording, ignored"
            );
            return Err(RecordingError::DuplicateStart {
                file: active.file.clone(),
            });
        }

        self.sequence += 1;
        let name = self
            .naming
            .file_name(&self.connection_id, self.sequence, Utc::now());

        match self.store.create(&name).await {
            Ok((file, sink)) => {
                info!(connection = %self.connection_id, file = %file.display(), "recording started");
                self.active = Some(ActiveRecording {
                    file: file.clone(),
                    sink,
                    bytes: 0,
                    chunks: 0,
                    started_at: Instant::now(),
                });
                Ok(Outcome::Started { file })
            }
            Err(source) => {
                error!(connection = %self.connection_id, file = %name, error = %source, "cannot open recording output");
                Err(RecordingError::ResourceUnavailable {
                    path: PathBuf::from(name),
                    source,
                })
            }
        }
    }

    async fn append(&mut self, chunk: &[u8]) -> Result<Outcome, RecordingError> {
        let Some(active) = self.active.as_mut() else {
            warn!(
                connection = %self.connection_id,
                len = chunk.len(),
                "data chunk while idle, discarded"
            );
            return Err(RecordingError::InvalidSequence("data chunk without active recording"));
        };
        if chunk.is_empty() {
            debug!(connection = %self.connection_id, "empty data chunk ignored");
            return Ok(Outcome::Unchanged);
        }

        let source = match active.sink.append(chunk).await {
            Ok(()) => {
                active.bytes += chunk.len() as u64;
                active.chunks += 1;
                return Ok(Outcome::Appended {
                    bytes: active.bytes,
                });
            }
            Err(e) => e,
        };

        // Write failed: release what we have and fall back to idle.
        let path = match self.active.take() {
            Some(active) => {
                let path = active.file.clone();
                if let Err(e) = active.finish(StopReason::Requested).await {
                    warn!(connection = %self.connection_id, error = %e, "flush after failed write also failed");
                }
                path
            }
            None => PathBuf::new(),
        };
        error!(
            connection = %self.connection_id,
            file = %path.display(),
            error = %source,
            "recording write failed, session reset to idle"
        );
        Err(RecordingError::ResourceUnavailable { path, source })
    }

    async fn stop(&mut self, reason: StopReason) -> Result<Outcome, RecordingError> {
        let Some(active) = self.active.take() else {
            debug!(connection = %self.connection_id, ?reason, "stop while idle, nothing to finalize");
            return Ok(Outcome::Unchanged);
        };

        let path = active.file.clone();
        match active.finish(reason).await {
            Ok(summary) => {
                info!(
                    connection = %self.connection_id,
                    file = %summary.file.display(),
                    bytes = summary.bytes,
                    chunks = summary.chunks,
                    ?reason,
                    "recording stopped"
                );
                Ok(Outcome::Stopped(summary))
            }
            Err(source) => {
                error!(connection = %self.connection_id, file = %path.display(), error = %source, "failed to finalize recording");
                Err(RecordingError::ResourceUnavailable { path, source })
            }
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            warn!(
                connection = %self.connection_id,
                file = %active.file.display(),
                "session dropped with an open recording, unflushed bytes may be lost"
            );
        }
    }
}

/// Last path component, or the whole path when there is none.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
