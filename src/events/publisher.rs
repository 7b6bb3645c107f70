use crate::models::EntityRef;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Fire-and-forget notification hook for completed transitions.
///
/// The engine calls the single `publish` entry point; listeners subscribe
/// externally through `subscribe`. Replaces a global dispatch registry with
/// an explicit, typed publisher injected into the engine.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<TransitionEvent>,
}

/// One completed state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub event_id: Uuid,
    pub entity: EntityRef,
    pub field_name: String,
    pub source_state_id: i64,
    pub destination_state_id: i64,
    pub actor: i64,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

impl TransitionEvent {
    pub fn new(
        entity: EntityRef,
        field_name: impl Into<String>,
        source_state_id: i64,
        destination_state_id: i64,
        actor: i64,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            entity,
            field_name: field_name.into(),
            source_state_id,
            destination_state_id,
            actor,
            occurred_at: chrono::Utc::now(),
        }
    }
}

impl EventPublisher {
    /// Create a new publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a transition event.
    ///
    /// A send with no subscribers is a success; the engine must not depend on
    /// anyone listening.
    pub fn publish(&self, event: TransitionEvent) -> Result<(), PublishError> {
        match self.sender.send(event) {
            Ok(_) => Ok(()),
            Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }

    /// Subscribe to transition events
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event channel is closed")]
    ChannelClosed,
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000) // Default capacity of 1000 events
    }
}
