use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{ProductId, UserId};
use crate::gateway::NotificationSink;
use crate::store::MemoryStore;

/// Durable notification intent.
///
/// Written in the same commit as the financial write that motivates it and
/// delivered asynchronously, so a sink outage can delay a notice but never
/// lose it or roll back a bid, deposit or settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub id: u64,
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub product_id: Option<ProductId>,
    pub created_at: DateTime<Utc>,
    pub delivered: bool,
}

/// Drains the outbox through the notification sink. Runs on its own tick in
/// the daemon, fully outside the bidding and settlement paths.
pub struct OutboxWorker {
    store: Arc<MemoryStore>,
    sink: Arc<dyn NotificationSink>,
}

impl OutboxWorker {
    pub fn new(store: Arc<MemoryStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { store, sink }
    }

    /// Attempts delivery of every pending intent. A failed send is logged
    /// and the intent stays queued for the next drain.
    pub async fn drain(&self) -> usize {
        let pending = self.store.undelivered_intents().await;
        if pending.is_empty() {
            return 0;
        }
        debug!(pending = pending.len(), "draining notification outbox");

        let mut delivered = 0;
        for intent in pending {
            match self
                .sink
                .send(intent.user_id, &intent.title, &intent.body, intent.product_id)
                .await
            {
                Ok(()) => {
                    self.store.mark_delivered(intent.id).await;
                    delivered += 1;
                }
                Err(err) => {
                    warn!(
                        intent = intent.id,
                        user = intent.user_id.0,
                        error = %err,
                        "notification delivery failed; intent stays queued"
                    );
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NotificationDraft;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Sink that fails every send until `healthy` is flipped
    #[derive(Default)]
    struct FlakySink {
        healthy: AtomicBool,
        sent: AtomicUsize,
    }

    #[async_trait]
    impl NotificationSink for FlakySink {
        async fn send(
            &self,
            _user_id: UserId,
            _title: &str,
            _body: &str,
            _product_id: Option<ProductId>,
        ) -> Result<()> {
            if self.healthy.load(Ordering::SeqCst) {
                self.sent.fetch_add(1, Ordering::SeqCst);
                Ok(())
            } else {
                Err(Error::NotificationFailed("sink offline".to_string()))
            }
        }
    }

    fn draft(user: u64) -> NotificationDraft {
        NotificationDraft {
            user_id: UserId(user),
            title: "Auction".to_string(),
            body: "hello".to_string(),
            product_id: None,
        }
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_intent_queued() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(FlakySink::default());
        store.enqueue_notifications(vec![draft(1), draft(2)]).await;

        let worker = OutboxWorker::new(store.clone(), sink.clone());
        assert_eq!(worker.drain().await, 0);
        assert_eq!(store.undelivered_intents().await.len(), 2);

        sink.healthy.store(true, Ordering::SeqCst);
        assert_eq!(worker.drain().await, 2);
        assert!(store.undelivered_intents().await.is_empty());
        assert_eq!(sink.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_drain_is_a_noop_on_empty_outbox() {
        let store = Arc::new(MemoryStore::new());
        let worker = OutboxWorker::new(store, Arc::new(FlakySink::default()));
        assert_eq!(worker.drain().await, 0);
    }
}
