use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auction::AuctionId;
use super::bid::BidId;
use super::{OrderId, PaymentId, UserId};

/// Offer identifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct OfferId(pub u64);

/// Offer settlement status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OfferStatus {
    /// Winner selected, payment not yet captured
    Pending,
    /// Winner charged and order placed
    Paid,
}

/// Settlement record linking the winning bid to the resulting order.
///
/// Created exactly once per auction, by the admin finalize step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuctionOffer {
    pub id: OfferId,
    pub auction_id: AuctionId,
    pub bid_id: BidId,
    pub user_id: UserId,

    /// Winner rank; 1 for the highest bid
    pub rank_order: u32,

    pub status: OfferStatus,
    pub order_id: Option<OrderId>,
    pub offered_at: DateTime<Utc>,
}

/// Record of a captured buy-now payment, written in the same commit as the
/// checkout. The status flip to ENDED happens in a second transaction; a
/// receipt left uncompleted marks an auction the recovery sweep must close.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuyNowReceipt {
    pub auction_id: AuctionId,
    pub user_id: UserId,
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}
