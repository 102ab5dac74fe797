//! Fan-out of named notifications to every connected client.

use recd_core::Notification;
use tokio::sync::broadcast;
use tracing::debug;

/// Publishes notifications to all connection loops.
///
/// Subscribers that fall more than `capacity` notifications behind lose the
/// oldest ones; they are never disconnected for it.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<Notification>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send `event` with `payload` to every subscriber. Returns how many
    /// subscribers it reached.
    pub fn broadcast(&self, event: &str, payload: serde_json::Value) -> usize {
        match self.tx.send(Notification::new(event, payload)) {
            Ok(receivers) => {
                debug!(event, receivers, "notification broadcast");
                receivers
            }
            Err(_) => {
                debug!(event, "notification dropped, no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}
