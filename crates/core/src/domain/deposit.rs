use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auction::AuctionId;
use super::money::Money;
use super::{PaymentId, UserId};

/// Deposit identifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DepositId(pub u64);

/// Escrow deposit lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DepositStatus {
    /// Captured from the bidder
    Paid,
    /// Returned at settlement
    Refunded,
}

/// Escrow captured with a bidder's first (only) bid on an auction.
///
/// Unique per (auction, user); created in the same commit as the bid and
/// refunded exactly once, at settlement, for every depositor but the winner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuctionDeposit {
    pub id: DepositId,
    pub auction_id: AuctionId,
    pub user_id: UserId,
    pub payment_id: Option<PaymentId>,
    pub amount: Money,
    pub status: DepositStatus,
    pub created_at: DateTime<Utc>,
}

impl AuctionDeposit {
    /// Settlement predicate: everyone but the winner gets their deposit
    /// back, once, and only when a payment reference exists to refund
    /// against.
    pub fn refundable_against(&self, winner: UserId) -> Option<PaymentId> {
        if self.user_id == winner || self.status == DepositStatus::Refunded {
            return None;
        }
        self.payment_id
    }
}
