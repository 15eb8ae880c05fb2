use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::{AuctionInfo, BidCommit, NotificationDraft};
use crate::domain::{
    Auction, AuctionDeposit, AuctionId, AuctionOffer, AuctionSpec, AuctionStatus, Bid, BidId,
    BuyNowReceipt, DepositId, DepositStatus, OfferId, OfferStatus, OrderId, ProductId, UserId,
};
use crate::notify::NotificationIntent;
use crate::{Error, Result};

#[derive(Default)]
struct StoreInner {
    auctions: HashMap<u64, Auction>,
    bids: Vec<Bid>,
    deposits: Vec<AuctionDeposit>,
    offers: Vec<AuctionOffer>,
    receipts: Vec<BuyNowReceipt>,
    outbox: Vec<NotificationIntent>,
    next_auction: u64,
    next_bid: u64,
    next_deposit: u64,
    next_offer: u64,
    next_intent: u64,
}

/// In-process auction store.
///
/// The single source of truth for auctions, bids, deposits, offers,
/// receipts and the notification outbox. Every method takes the state lock
/// once and applies its writes atomically, so each call is one commit unit.
/// Cross-read-write sections (verify-then-insert) are serialized per
/// auction through [`MemoryStore::lock_auction`]; bids on different
/// auctions never contend.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
    auction_locks: std::sync::Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialization primitive for one auction's read-compute-write
    /// sections. Hold the guard across verification and the commit; drop it
    /// to let the next bidder (or sweep) in.
    pub async fn lock_auction(&self, id: AuctionId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.auction_locks.lock().expect("auction lock registry");
            locks.entry(id.0).or_default().clone()
        };
        slot.lock_owned().await
    }

    // ---- auctions ----

    pub async fn get_auction(&self, id: AuctionId) -> Option<Auction> {
        self.inner.read().await.auctions.get(&id.0).cloned()
    }

    pub async fn find_auction_by_product(&self, product_id: ProductId) -> Option<Auction> {
        self.inner
            .read()
            .await
            .auctions
            .values()
            .find(|a| a.product_id == product_id)
            .cloned()
    }

    /// Creates or replaces the auction described by `spec`. Validation and
    /// edit guards belong to the admin service; this only writes.
    pub async fn upsert_auction(&self, spec: &AuctionSpec, now: DateTime<Utc>) -> Auction {
        let mut inner = self.inner.write().await;
        let existing = spec.id.and_then(|id| inner.auctions.get(&id.0).cloned());
        let (id, created_at) = match existing {
            Some(a) => (a.id, a.created_at),
            None => {
                inner.next_auction += 1;
                (AuctionId(inner.next_auction), now)
            }
        };
        let auction = Auction {
            id,
            product_id: spec.product_id,
            start_price: spec.start_price,
            min_bid_price: spec.min_bid_price,
            buy_now_price: spec.buy_now_price,
            deposit_amount: spec.deposit_amount,
            starts_at: spec.starts_at,
            ends_at: spec.ends_at,
            status: spec.status.unwrap_or(AuctionStatus::Scheduled),
            created_at,
            updated_at: now,
        };
        inner.auctions.insert(id.0, auction.clone());
        auction
    }

    pub async fn set_status(
        &self,
        id: AuctionId,
        status: AuctionStatus,
        now: DateTime<Utc>,
    ) -> Result<Auction> {
        let mut inner = self.inner.write().await;
        let auction = inner.auctions.get_mut(&id.0).ok_or(Error::AuctionNotFound)?;
        auction.status = status;
        auction.updated_at = now;
        Ok(auction.clone())
    }

    /// SCHEDULED auctions whose window has opened
    pub async fn due_for_start(&self, now: DateTime<Utc>) -> Vec<AuctionId> {
        self.inner
            .read()
            .await
            .auctions
            .values()
            .filter(|a| a.status == AuctionStatus::Scheduled && a.starts_at <= now)
            .map(|a| a.id)
            .collect()
    }

    /// RUNNING auctions whose window has closed
    pub async fn due_for_settlement(&self, now: DateTime<Utc>) -> Vec<AuctionId> {
        self.inner
            .read()
            .await
            .auctions
            .values()
            .filter(|a| a.is_due_for_settlement(now))
            .map(|a| a.id)
            .collect()
    }

    // ---- bids ----

    pub async fn auction_info(&self, id: AuctionId) -> Option<AuctionInfo> {
        let inner = self.inner.read().await;
        let auction = inner.auctions.get(&id.0).cloned()?;
        let current_highest = inner
            .bids
            .iter()
            .filter(|b| b.auction_id == id)
            .map(|b| b.amount)
            .max();
        let bidder_count = distinct_bidders_of(&inner.bids, id).len();
        Some(AuctionInfo {
            auction,
            current_highest,
            bidder_count,
        })
    }

    pub async fn bids_for(&self, id: AuctionId) -> Vec<Bid> {
        let mut bids: Vec<Bid> = self
            .inner
            .read()
            .await
            .bids
            .iter()
            .filter(|b| b.auction_id == id)
            .cloned()
            .collect();
        bids.sort_by_key(|b| b.bid_order);
        bids
    }

    pub async fn find_bid(&self, id: AuctionId, user_id: UserId) -> Option<Bid> {
        self.inner
            .read()
            .await
            .bids
            .iter()
            .find(|b| b.auction_id == id && b.user_id == user_id)
            .cloned()
    }

    /// Distinct bidders in first-bid order
    pub async fn distinct_bidders(&self, id: AuctionId) -> Vec<UserId> {
        distinct_bidders_of(&self.inner.read().await.bids, id)
    }

    /// Winning bid: highest amount, then latest created_at, with bid_order
    /// as the deterministic final tie-break.
    pub async fn winning_bid(&self, id: AuctionId) -> Option<Bid> {
        self.inner
            .read()
            .await
            .bids
            .iter()
            .filter(|b| b.auction_id == id)
            .max_by_key(|b| (b.amount, b.created_at, b.bid_order))
            .cloned()
    }

    /// Commits one accepted bid: the bid row, its deposit and the staged
    /// notifications, in a single state-lock application. The (auction,
    /// user) uniqueness constraint is re-enforced here, the same way a
    /// unique index backstops the verifier's check.
    pub async fn commit_bid(&self, commit: BidCommit) -> Result<Bid> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        if inner
            .bids
            .iter()
            .any(|b| b.auction_id == commit.auction_id && b.user_id == commit.user_id)
        {
            return Err(Error::BidAlreadyExists);
        }

        let bid_order = inner
            .bids
            .iter()
            .filter(|b| b.auction_id == commit.auction_id)
            .map(|b| b.bid_order)
            .max()
            .unwrap_or(0)
            + 1;
        inner.next_bid += 1;
        let bid = Bid {
            id: BidId(inner.next_bid),
            auction_id: commit.auction_id,
            user_id: commit.user_id,
            amount: commit.amount,
            bid_order,
            created_at: now,
        };
        inner.bids.push(bid.clone());

        if let Some(deposit) = commit.deposit {
            inner.next_deposit += 1;
            let row = AuctionDeposit {
                id: DepositId(inner.next_deposit),
                auction_id: commit.auction_id,
                user_id: commit.user_id,
                payment_id: Some(deposit.payment_id),
                amount: deposit.amount,
                status: DepositStatus::Paid,
                created_at: now,
            };
            inner.deposits.push(row);
        }

        push_intents(&mut inner, commit.notifications, now);
        Ok(bid)
    }

    // ---- deposits ----

    pub async fn deposits_for(&self, id: AuctionId) -> Vec<AuctionDeposit> {
        self.inner
            .read()
            .await
            .deposits
            .iter()
            .filter(|d| d.auction_id == id)
            .cloned()
            .collect()
    }

    pub async fn mark_deposit_refunded(&self, id: DepositId) {
        let mut inner = self.inner.write().await;
        if let Some(d) = inner.deposits.iter_mut().find(|d| d.id == id) {
            d.status = DepositStatus::Refunded;
        }
    }

    // ---- offers ----

    pub async fn offer_for(&self, id: AuctionId) -> Option<AuctionOffer> {
        self.inner
            .read()
            .await
            .offers
            .iter()
            .find(|o| o.auction_id == id)
            .cloned()
    }

    pub async fn insert_offer(
        &self,
        auction_id: AuctionId,
        bid_id: BidId,
        user_id: UserId,
        rank_order: u32,
        status: OfferStatus,
        order_id: Option<OrderId>,
    ) -> AuctionOffer {
        let mut inner = self.inner.write().await;
        inner.next_offer += 1;
        let offer = AuctionOffer {
            id: OfferId(inner.next_offer),
            auction_id,
            bid_id,
            user_id,
            rank_order,
            status,
            order_id,
            offered_at: Utc::now(),
        };
        inner.offers.push(offer.clone());
        offer
    }

    // ---- buy-now receipts ----

    pub async fn push_receipt(&self, receipt: BuyNowReceipt) {
        self.inner.write().await.receipts.push(receipt);
    }

    pub async fn open_receipts(&self) -> Vec<BuyNowReceipt> {
        self.inner
            .read()
            .await
            .receipts
            .iter()
            .filter(|r| !r.completed)
            .cloned()
            .collect()
    }

    /// Transaction 2 of the buy-now flow: flips the auction to ENDED,
    /// completes the receipt and stages the close-out notifications, in one
    /// commit unit.
    pub async fn commit_buy_now_close(
        &self,
        auction_id: AuctionId,
        notifications: Vec<NotificationDraft>,
    ) -> Result<()> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let auction = inner
            .auctions
            .get_mut(&auction_id.0)
            .ok_or(Error::AuctionNotFound)?;
        auction.status = AuctionStatus::Ended;
        auction.updated_at = now;
        if let Some(r) = inner
            .receipts
            .iter_mut()
            .find(|r| r.auction_id == auction_id && !r.completed)
        {
            r.completed = true;
        }
        push_intents(&mut inner, notifications, now);
        Ok(())
    }

    // ---- notification outbox ----

    pub async fn enqueue_notifications(&self, drafts: Vec<NotificationDraft>) {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        push_intents(&mut inner, drafts, now);
    }

    pub async fn undelivered_intents(&self) -> Vec<NotificationIntent> {
        self.inner
            .read()
            .await
            .outbox
            .iter()
            .filter(|i| !i.delivered)
            .cloned()
            .collect()
    }

    pub async fn mark_delivered(&self, intent_id: u64) {
        let mut inner = self.inner.write().await;
        if let Some(i) = inner.outbox.iter_mut().find(|i| i.id == intent_id) {
            i.delivered = true;
        }
    }

    pub async fn outbox_len(&self) -> usize {
        self.inner.read().await.outbox.len()
    }
}

fn distinct_bidders_of(bids: &[Bid], id: AuctionId) -> Vec<UserId> {
    let mut ordered: Vec<&Bid> = bids.iter().filter(|b| b.auction_id == id).collect();
    ordered.sort_by_key(|b| b.bid_order);
    let mut seen = Vec::new();
    for bid in ordered {
        if !seen.contains(&bid.user_id) {
            seen.push(bid.user_id);
        }
    }
    seen
}

fn push_intents(inner: &mut StoreInner, drafts: Vec<NotificationDraft>, now: DateTime<Utc>) {
    for draft in drafts {
        inner.next_intent += 1;
        let intent = NotificationIntent {
            id: inner.next_intent,
            user_id: draft.user_id,
            title: draft.title,
            body: draft.body,
            product_id: draft.product_id,
            created_at: now,
            delivered: false,
        };
        inner.outbox.push(intent);
    }
}
