//! Connection → recording session table.
//!
//! Tracks one [`RecordingSession`] per live connection. Each session sits
//! behind its own mutex so signals for one connection apply strictly in
//! order, while unrelated connections never contend beyond the brief table
//! lookup.

use super::error::RecordingError;
use super::output::OutputStore;
use super::session::{NamingScheme, Outcome, RecordingSession, SessionInfo, Signal};
use recd_core::{ConnectionId, RecdError, RecdResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Manages the recording sessions of all live connections.
pub struct SessionManager {
    sessions: RwLock<HashMap<ConnectionId, Arc<Mutex<RecordingSession>>>>,
    store: Arc<dyn OutputStore>,
    naming: NamingScheme,
    max_connections: usize,
}

impl SessionManager {
    pub fn new(store: Arc<dyn OutputStore>, naming: NamingScheme, max_connections: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            store,
            naming,
            max_connections,
        }
    }

    /// Register a new connection with an idle session.
    pub async fn connect(&self) -> RecdResult<ConnectionId> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_connections {
            return Err(RecdError::ConnectionLimit(self.max_connections));
        }

        let mut id = ConnectionId::generate();
        while sessions.contains_key(&id) {
            id = ConnectionId::generate();
        }
        let session = RecordingSession::new(id.clone(), self.store.clone(), self.naming.clone());
        sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        debug!(connection = %id, live = sessions.len(), "session registered");
        Ok(id)
    }

    pub async fn on_start(&self, id: &ConnectionId) -> Result<Outcome, RecordingError> {
        self.dispatch(id, Signal::Start).await
    }

    pub async fn on_data(&self, id: &ConnectionId, chunk: Vec<u8>) -> Result<Outcome, RecordingError> {
        self.dispatch(id, Signal::Data(chunk)).await
    }

    pub async fn on_stop(&self, id: &ConnectionId) -> Result<Outcome, RecordingError> {
        self.dispatch(id, Signal::Stop).await
    }

    /// Remove the session and finalize any recording in progress.
    ///
    /// Calling this again for the same connection is a no-op.
    pub async fn on_disconnect(&self, id: &ConnectionId) -> Result<Outcome, RecordingError> {
        let session = self.sessions.write().await.remove(id);
        let Some(session) = session else {
            debug!(connection = %id, "disconnect for unknown connection ignored");
            return Ok(Outcome::Unchanged);
        };
        let mut session = session.lock().await;
        let outcome = session.handle(Signal::Disconnect).await;
        info!(connection = %id, "session closed");
        outcome
    }

    /// Apply a signal to the session of `id`.
    pub async fn dispatch(&self, id: &ConnectionId, signal: Signal) -> Result<Outcome, RecordingError> {
        if signal == Signal::Disconnect {
            return self.on_disconnect(id).await;
        }
        let session = self
            .sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RecordingError::UnknownConnection(id.clone()))?;
        let mut session = session.lock().await;
        session.handle(signal).await
    }

    /// Snapshot every live session.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let handles: Vec<_> = self.sessions.read().await.values().cloned().collect();
        let mut infos = Vec::with_capacity(handles.len());
        for handle in handles {
            infos.push(handle.lock().await.info());
        }
        infos
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::output::DirectoryStore;
    use crate::recording::session::SessionState;
    use crate::recording::testing::MemoryStore;

    fn manager_with(store: Arc<dyn OutputStore>) -> SessionManager {
        SessionManager::new(store, NamingScheme::default(), 16)
    }

    #[tokio::test]
    async fn unknown_connection_is_reported() {
        let manager = manager_with(Arc::new(MemoryStore::default()));
        let err = manager
            .on_start(&ConnectionId::from("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordingError::UnknownConnection(_)));
    }

    #[tokio::test]
    async fn connection_limit_is_enforced() {
        let manager = SessionManager::new(
            Arc::new(MemoryStore::default()),
            NamingScheme::default(),
            1,
        );
        let first = manager.connect().await.unwrap();
        assert!(matches!(
            manager.connect().await,
            Err(RecdError::ConnectionLimit(1))
        ));
        manager.on_disconnect(&first).await.unwrap();
        manager.connect().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_starts_produce_distinct_files() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = Arc::new(manager_with(Arc::new(DirectoryStore::new(tmp.path()))));
        let a = manager.connect().await.unwrap();
        let b = manager.connect().await.unwrap();

        let (ra, rb) = tokio::join!(manager.on_start(&a), manager.on_start(&b));
        let (fa, fb) = match (ra.unwrap(), rb.unwrap()) {
            (Outcome::Started { file: fa }, Outcome::Started { file: fb }) => (fa, fb),
            other => panic!("expected two starts, got {other:?}"),
        };
        assert_ne!(fa, fb);

        let (da, db) = tokio::join!(
            manager.on_data(&a, vec![0xAA]),
            manager.on_data(&b, vec![0xBB])
        );
        da.unwrap();
        db.unwrap();
        manager.on_stop(&a).await.unwrap();
        manager.on_stop(&b).await.unwrap();

        assert_eq!(std::fs::read(&fa).unwrap(), vec![0xAA]);
        assert_eq!(std::fs::read(&fb).unwrap(), vec![0xBB]);
    }

    #[tokio::test]
    async fn many_sessions_in_parallel_keep_their_own_bytes() {
        let store = MemoryStore::default();
        let manager = Arc::new(manager_with(Arc::new(store.clone())));

        let mut tasks = Vec::new();
        for n in 0..8u8 {
            let manager = manager.clone();
            tasks.push(tokio::spawn(async move {
                let id = manager.connect().await.unwrap();
                manager.on_start(&id).await.unwrap();
                for i in 0..20u8 {
                    manager.on_data(&id, vec![n, i]).await.unwrap();
                    tokio::task::yield_now().await;
                }
                manager.on_disconnect(&id).await.unwrap();
                id
            }));
        }
        for task in tasks {
            let id = task.await.unwrap();
            let name = store
                .names()
                .into_iter()
                .find(|name| name.contains(id.as_str()))
                .unwrap();
            let bytes = store.bytes(&name);
            let n = bytes[0];
            let expected: Vec<u8> = (0..20u8).flat_map(|i| [n, i]).collect();
            assert_eq!(bytes, expected);
            assert_eq!(store.finish_count(&name), 1);
        }
        assert_eq!(manager.count().await, 0);
    }

    #[tokio::test]
    async fn interleaved_stop_and_disconnect_release_once() {
        let store = MemoryStore::default();
        let manager = Arc::new(manager_with(Arc::new(store.clone())));
        let id = manager.connect().await.unwrap();
        manager.on_start(&id).await.unwrap();
        manager.on_data(&id, vec![7]).await.unwrap();

        let (stop, disconnect) = tokio::join!(manager.on_stop(&id), manager.on_disconnect(&id));
        let stopped = [stop, disconnect]
            .into_iter()
            .filter(|r| matches!(r, Ok(Outcome::Stopped(_))))
            .count();
        assert_eq!(stopped, 1);

        let name = store.names().pop().unwrap();
        assert_eq!(store.finish_count(&name), 1);
        assert_eq!(store.bytes(&name), vec![7]);
    }

    #[tokio::test]
    async fn disconnect_twice_is_noop() {
        let store = MemoryStore::default();
        let manager = manager_with(Arc::new(store.clone()));
        let id = manager.connect().await.unwrap();
        manager.on_start(&id).await.unwrap();

        assert!(matches!(
            manager.on_disconnect(&id).await.unwrap(),
            Outcome::Stopped(_)
        ));
        assert!(matches!(
            manager.on_disconnect(&id).await.unwrap(),
            Outcome::Unchanged
        ));
        assert_eq!(store.finish_count(&store.names()[0]), 1);
    }

    #[tokio::test]
    async fn disconnect_without_start_creates_nothing() {
        let store = MemoryStore::default();
        let manager = manager_with(Arc::new(store.clone()));
        let id = manager.connect().await.unwrap();
        assert!(matches!(
            manager.dispatch(&id, Signal::Disconnect).await.unwrap(),
            Outcome::Unchanged
        ));
        assert_eq!(store.output_count(), 0);
        assert_eq!(manager.count().await, 0);
    }

    #[tokio::test]
    async fn list_reports_recording_sessions() {
        let manager = manager_with(Arc::new(MemoryStore::default()));
        let idle = manager.connect().await.unwrap();
        let busy = manager.connect().await.unwrap();
        manager.on_start(&busy).await.unwrap();
        manager.on_data(&busy, vec![1, 2, 3]).await.unwrap();

        let infos = manager.list().await;
        assert_eq!(infos.len(), 2);
        let idle_info = infos.iter().find(|i| i.connection_id == idle).unwrap();
        assert_eq!(idle_info.state, SessionState::Idle);
        assert!(idle_info.file.is_none());
        let busy_info = infos.iter().find(|i| i.connection_id == busy).unwrap();
        assert_eq!(busy_info.state, SessionState::Recording);
        assert_eq!(busy_info.bytes, 3);
    }
}
