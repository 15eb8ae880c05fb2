use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::domain::{Auction, AuctionId, AuctionSpec, AuctionStatus};
use crate::store::{MemoryStore, NotificationDraft};
use crate::{Error, Result};

/// Admin-facing auction management: upsert with edit guards, and the
/// status state machine for pause / resume / cancel.
pub struct AdminService {
    store: Arc<MemoryStore>,
}

impl AdminService {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Creates or edits an auction.
    ///
    /// Price rule and time window are validated first; a product can hold
    /// only one auction; an existing auction can only be edited while it is
    /// still SCHEDULED and before its start.
    pub async fn upsert(&self, spec: AuctionSpec) -> Result<Auction> {
        spec.validate()?;

        let existing = self.store.find_auction_by_product(spec.product_id).await;
        if let Some(ref other) = existing {
            if spec.id != Some(other.id) {
                return Err(Error::ProductAlreadyHasAuction);
            }
        }

        let target = match spec.id {
            Some(id) => self.store.get_auction(id).await,
            None => None,
        }
        .or(existing);
        if let Some(target) = target {
            let now = Utc::now();
            if !(target.status == AuctionStatus::Scheduled && now < target.starts_at) {
                return Err(Error::InvalidAuctionStatus(
                    "auctions can only be edited while scheduled and before their start"
                        .to_string(),
                ));
            }
        }

        let auction = self.store.upsert_auction(&spec, Utc::now()).await;
        info!(
            auction = auction.id.0,
            product = auction.product_id.0,
            "auction upserted"
        );
        Ok(auction)
    }

    pub async fn detail(&self, auction_id: AuctionId) -> Result<Auction> {
        self.store
            .get_auction(auction_id)
            .await
            .ok_or(Error::AuctionNotFound)
    }

    /// Applies an admin status transition.
    ///
    /// CANCELLED only from RUNNING; RUNNING only inside the time window;
    /// PAUSED only from RUNNING; anything else is rejected. A successful
    /// pause or resume notifies every distinct bidder so far.
    pub async fn set_status(
        &self,
        auction_id: AuctionId,
        requested: AuctionStatus,
    ) -> Result<Auction> {
        let _guard = self.store.lock_auction(auction_id).await;

        let auction = self
            .store
            .get_auction(auction_id)
            .await
            .ok_or(Error::AuctionNotFound)?;
        let now = Utc::now();

        match requested {
            AuctionStatus::Cancelled => {
                if !auction.is_running() {
                    return Err(Error::CannotCancelNonRunning);
                }
            }
            AuctionStatus::Running => {
                if !auction.window_contains(now) {
                    return Err(Error::CannotResumeExpiredAuction);
                }
            }
            AuctionStatus::Paused => {
                if !auction.is_running() {
                    return Err(Error::InvalidAuctionStatus(
                        "only a running auction can be paused".to_string(),
                    ));
                }
            }
            _ => {
                return Err(Error::InvalidAuctionStatus(
                    "status cannot be set directly".to_string(),
                ));
            }
        }

        let updated = self.store.set_status(auction_id, requested, now).await?;
        info!(
            auction = auction_id.0,
            status = ?requested,
            "auction status changed"
        );

        let message = match requested {
            AuctionStatus::Paused => Some("The auction has been paused."),
            AuctionStatus::Running => Some("The auction has resumed."),
            _ => None,
        };
        if let Some(message) = message {
            let drafts: Vec<NotificationDraft> = self
                .store
                .distinct_bidders(auction_id)
                .await
                .into_iter()
                .map(|uid| NotificationDraft {
                    user_id: uid,
                    title: "Auction update".to_string(),
                    body: message.to_string(),
                    product_id: Some(updated.product_id),
                })
                .collect();
            self.store.enqueue_notifications(drafts).await;
        }

        Ok(updated)
    }
}
