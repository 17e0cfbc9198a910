use async_trait::async_trait;

use crate::repository::StoreError;

/// Outbound event bus for lifecycle transitions.
///
/// Publication happens after a transition is committed and is best-effort:
/// callers log failures instead of undoing the transition.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), StoreError>;
}

/// Publisher that only traces events, used when no broker is configured
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), StoreError> {
        tracing::info!(topic, key, "Event: {}", payload);
        Ok(())
    }
}

/// Serialize and publish, logging instead of failing
pub async fn publish_json<T: serde::Serialize>(
    publisher: &dyn EventPublisher,
    topic: &str,
    key: &str,
    event: &T,
) {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Failed to serialize {} event: {}", topic, e);
            return;
        }
    };

    if let Err(e) = publisher.publish(topic, key, &payload).await {
        tracing::warn!("Failed to publish {} for {}: {}", topic, key, e);
    }
}
