use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auction::AuctionId;
use super::money::Money;
use super::UserId;

/// Bid identifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BidId(pub u64);

/// An accepted claim on one price rung.
///
/// Immutable once recorded; a user holds at most one bid per auction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bid {
    pub id: BidId,
    pub auction_id: AuctionId,
    pub user_id: UserId,

    /// Claimed rung amount
    pub amount: Money,

    /// Strictly increasing per auction; doubles as a deterministic
    /// tie-break for bids that share a timestamp
    pub bid_order: u32,

    pub created_at: DateTime<Utc>,
}
