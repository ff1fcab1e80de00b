use crate::constants::DEFAULT_PUBLISHER_CAPACITY;
use crate::events::types::EvaluatorEvent;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// Broadcast publisher for delivered lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    /// Unique per publication, for correlating downstream consumers
    pub event_id: Uuid,
    pub name: String,
    pub evaluator_id: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event with the given name and context
    pub fn publish(
        &self,
        event_name: impl Into<String>,
        evaluator_id: impl Into<String>,
        context: Value,
    ) {
        let event = PublishedEvent {
            event_id: Uuid::new_v4(),
            name: event_name.into(),
            evaluator_id: evaluator_id.into(),
            context,
            published_at: chrono::Utc::now(),
        };

        // send() only fails when nobody is subscribed, which is fine for lifecycle events
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!(event = %event.name, "No subscribers for lifecycle event");
        }
    }

    /// Publish a dispatcher event under its lifecycle name
    pub fn publish_event(&self, event: &EvaluatorEvent) {
        self.publish(event.name(), event.evaluator_id(), event.summary())
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLISHER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let publisher = EventPublisher::default();
        assert_eq!(publisher.subscriber_count(), 0);
        publisher.publish("evaluator.completed", "eval-1", json!({}));
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let publisher = EventPublisher::new(16);
        let mut receiver = publisher.subscribe();

        publisher.publish("evaluator.failed", "eval-1", json!({"message": "boom"}));

        let event = receiver.recv().await.unwrap();
        assert!(!event.event_id.is_nil());
        assert_eq!(event.name, "evaluator.failed");
        assert_eq!(event.evaluator_id, "eval-1");
        assert_eq!(event.context["message"], "boom");
    }
}
