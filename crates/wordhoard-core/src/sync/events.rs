//! Change notifications published by the sync engine

use tokio::sync::broadcast;

use crate::models::Scope;
use crate::services::ReconcileReport;
use crate::state::SyncState;

/// Default buffer of the event channel; slow receivers see `Lagged`.
pub const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    StateChanged(SyncState),
    /// One per delivered snapshot, never one per document
    SnapshotApplied {
        scope: Scope,
        report: ReconcileReport,
    },
    Pushed {
        pushed: usize,
        deleted: usize,
    },
    ListenerError {
        scope: Scope,
        message: String,
    },
}

/// Broadcast channel owned by the engine.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers; nobody listening is fine.
    pub fn publish(&self, event: SyncEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::default();
        let mut receiver = bus.subscribe();

        bus.publish(SyncEvent::StateChanged(SyncState::Syncing));
        assert_eq!(
            receiver.recv().await.unwrap(),
            SyncEvent::StateChanged(SyncState::Syncing)
        );
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        EventBus::new(0).publish(SyncEvent::Pushed {
            pushed: 0,
            deleted: 0,
        });
    }
}
