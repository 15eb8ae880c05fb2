use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{
    AuctionId, AuctionStatus, Money, OfferId, OfferStatus, OrderId, PaymentId, UserId,
};
use crate::gateway::{OrderGateway, PaymentGateway};
use crate::store::{MemoryStore, NotificationDraft};
use crate::{Error, Result};

/// Outcome of the admin finalize step. `payment_id` is only present on the
/// call that actually captured the charge; replays return the recorded
/// offer without one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalizeResult {
    pub offer_id: OfferId,
    pub user_id: UserId,
    pub amount: Money,
    pub order_id: Option<OrderId>,
    pub payment_id: Option<PaymentId>,
    pub status: OfferStatus,
}

/// Time-driven RUNNING → ENDED settlement, plus the admin finalize step.
///
/// The sweep settles one auction per transaction under its lock: pick the
/// winner, refund every other depositor, flip to ENDED, then queue the
/// winner notice. Re-running over an ended auction is a no-op: the sweep
/// selects on RUNNING and refunds skip anything already REFUNDED.
pub struct SettlementEngine {
    store: Arc<MemoryStore>,
    payments: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderGateway>,
}

impl SettlementEngine {
    pub fn new(
        store: Arc<MemoryStore>,
        payments: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderGateway>,
    ) -> Self {
        Self {
            store,
            payments,
            orders,
        }
    }

    /// Settles every running auction whose window has closed. An error on
    /// one auction is logged and the sweep moves on; the next tick picks
    /// the auction up again.
    pub async fn run_once(&self) -> usize {
        let now = Utc::now();
        let due = self.store.due_for_settlement(now).await;
        let mut settled = 0;
        for id in due {
            match self.settle_auction(id, now).await {
                Ok(true) => settled += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(auction = id.0, error = %err, "settlement failed; will retry next sweep");
                }
            }
        }
        settled
    }

    /// Settles a single auction. Returns false when there was nothing to
    /// do (picked up by a concurrent actor, or no longer due).
    async fn settle_auction(&self, id: AuctionId, now: DateTime<Utc>) -> Result<bool> {
        let _guard = self.store.lock_auction(id).await;

        let Some(auction) = self.store.get_auction(id).await else {
            return Ok(false);
        };
        if !auction.is_due_for_settlement(now) {
            return Ok(false);
        }

        let Some(winner) = self.store.winning_bid(id).await else {
            self.store.set_status(id, AuctionStatus::Ended, now).await?;
            info!(auction = id.0, "auction ended with no bids");
            return Ok(true);
        };

        for deposit in self.store.deposits_for(id).await {
            if let Some(payment_id) = deposit.refundable_against(winner.user_id) {
                self.payments.refund(payment_id, deposit.amount).await?;
                self.store.mark_deposit_refunded(deposit.id).await;
                info!(
                    auction = id.0,
                    user = deposit.user_id.0,
                    amount = deposit.amount.units(),
                    "deposit refunded"
                );
            }
        }

        self.store.set_status(id, AuctionStatus::Ended, now).await?;

        // winner notice rides the outbox, after the close committed
        self.store
            .enqueue_notifications(vec![NotificationDraft {
                user_id: winner.user_id,
                title: "You won the auction".to_string(),
                body: format!(
                    "Your bid of {} won. Please complete the payment.",
                    winner.amount
                ),
                product_id: Some(auction.product_id),
            }])
            .await;

        info!(
            auction = id.0,
            winner = winner.user_id.0,
            amount = winner.amount.units(),
            "auction settled"
        );
        Ok(true)
    }

    /// Admin-triggered post-settlement step: charges the winner at their
    /// winning amount and records the offer linking bid to order. Requires
    /// an ENDED auction; a repeat call returns the existing offer without
    /// charging again.
    pub async fn finalize(&self, auction_id: AuctionId) -> Result<FinalizeResult> {
        let _guard = self.store.lock_auction(auction_id).await;

        let auction = self
            .store
            .get_auction(auction_id)
            .await
            .ok_or(Error::AuctionNotFound)?;
        if auction.status != AuctionStatus::Ended {
            return Err(Error::InvalidAuctionStatus(
                "finalize requires an ended auction".to_string(),
            ));
        }

        let winner = self
            .store
            .winning_bid(auction_id)
            .await
            .ok_or(Error::WinnerNotFound)?;

        if let Some(existing) = self.store.offer_for(auction_id).await {
            return Ok(FinalizeResult {
                offer_id: existing.id,
                user_id: existing.user_id,
                amount: winner.amount,
                order_id: existing.order_id,
                payment_id: None,
                status: existing.status,
            });
        }

        let checkout = self
            .orders
            .checkout(winner.user_id, auction.product_id, winner.amount)
            .await?;
        let offer = self
            .store
            .insert_offer(
                auction_id,
                winner.id,
                winner.user_id,
                1,
                OfferStatus::Paid,
                Some(checkout.order_id),
            )
            .await;
        info!(
            auction = auction_id.0,
            winner = winner.user_id.0,
            order = checkout.order_id.0,
            amount = winner.amount.units(),
            "winner finalized and charged"
        );
        Ok(FinalizeResult {
            offer_id: offer.id,
            user_id: offer.user_id,
            amount: winner.amount,
            order_id: offer.order_id,
            payment_id: Some(checkout.payment_id),
            status: offer.status,
        })
    }
}
