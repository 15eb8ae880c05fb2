use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::domain::AuctionStatus;
use crate::store::MemoryStore;

/// Time-driven SCHEDULED → RUNNING transition, invoked periodically.
///
/// Idempotent: a sweep that finds nothing due is a no-op, and each row is
/// re-checked under its auction lock before the flip.
pub struct LifecycleScheduler {
    store: Arc<MemoryStore>,
}

impl LifecycleScheduler {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Opens every scheduled auction whose window has started and not yet
    /// ended. Returns how many were opened.
    pub async fn run_once(&self) -> usize {
        let now = Utc::now();
        let due = self.store.due_for_start(now).await;
        let mut opened = 0;
        for id in due {
            let _guard = self.store.lock_auction(id).await;
            let Some(auction) = self.store.get_auction(id).await else {
                continue;
            };
            // re-check under the lock; an admin may have moved the row
            if auction.status != AuctionStatus::Scheduled || auction.starts_at > now {
                continue;
            }
            if auction.ends_at <= now {
                // window already over; settlement has nothing to do with a
                // never-opened auction, leave it scheduled for the admin
                continue;
            }
            if self
                .store
                .set_status(id, AuctionStatus::Running, now)
                .await
                .is_ok()
            {
                info!(auction = id.0, "auction opened");
                opened += 1;
            }
        }
        opened
    }
}
