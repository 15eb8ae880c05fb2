pub mod memory;

pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

use crate::domain::{Auction, AuctionId, Money, PaymentId, ProductId, UserId};

/// Read snapshot of one auction's bidding state, consumed by verification
/// and the catalog-facing board query.
#[derive(Debug, Clone)]
pub struct AuctionInfo {
    pub auction: Auction,

    /// Highest accepted amount, `None` while no bid exists
    pub current_highest: Option<Money>,

    /// Number of distinct users holding a bid
    pub bidder_count: usize,
}

impl AuctionInfo {
    /// Base the ladder starts from: the highest bid, or the minimum bid
    /// price while the book is empty.
    pub fn ladder_base(&self) -> Money {
        self.current_highest.unwrap_or(self.auction.min_bid_price)
    }
}

/// Notification staged for the outbox, before an id is assigned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub product_id: Option<ProductId>,
}

/// Deposit rows staged by bid placement
#[derive(Debug, Clone, Copy)]
pub struct DepositCommit {
    pub payment_id: PaymentId,
    pub amount: Money,
}

/// Everything one accepted bid writes, committed as a single unit: the bid
/// row, its deposit (when the auction requires one), and the notification
/// intents. Either all of it lands or none of it does.
#[derive(Debug, Clone)]
pub struct BidCommit {
    pub auction_id: AuctionId,
    pub user_id: UserId,
    pub amount: Money,
    pub deposit: Option<DepositCommit>,
    pub notifications: Vec<NotificationDraft>,
}
