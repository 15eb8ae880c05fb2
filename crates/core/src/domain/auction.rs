use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::Money;
use crate::{Error, Result};

/// Auction identifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AuctionId(pub u64);

/// Product identifier, owned by the catalog domain (out of scope here).
/// A product has at most one auction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ProductId(pub u64);

/// Auction lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuctionStatus {
    /// Created but not yet open for bidding
    Scheduled,
    /// Open for bidding
    Running,
    /// Temporarily suspended by an admin
    Paused,
    /// Closed; terminal
    Ended,
    /// Aborted by an admin; terminal
    Cancelled,
}

impl AuctionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuctionStatus::Ended | AuctionStatus::Cancelled)
    }
}

/// A single-unit, time-boxed ascending-price auction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Auction {
    /// Unique auction identifier
    pub id: AuctionId,

    /// Product being sold; at most one auction per product
    pub product_id: ProductId,

    /// Listing price shown when the auction opens
    pub start_price: Money,

    /// Base amount the bid ladder starts from while no bid exists
    pub min_bid_price: Money,

    /// Optional instant-settlement price; also caps the bid ladder
    pub buy_now_price: Option<Money>,

    /// Escrow amount captured with a bidder's first (only) bid
    pub deposit_amount: Money,

    /// Start of the bidding window
    pub starts_at: DateTime<Utc>,

    /// End of the bidding window
    pub ends_at: DateTime<Utc>,

    /// Lifecycle status
    pub status: AuctionStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auction {
    pub fn is_running(&self) -> bool {
        self.status == AuctionStatus::Running
    }

    /// True while `now` falls inside the bidding window
    pub fn window_contains(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now <= self.ends_at
    }

    /// True once a running auction has outlived its window
    pub fn is_due_for_settlement(&self, now: DateTime<Utc>) -> bool {
        self.is_running() && self.ends_at <= now
    }
}

/// Admin upsert request for creating or editing an auction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionSpec {
    /// Target auction for updates; `None` creates a new one
    pub id: Option<AuctionId>,

    pub product_id: ProductId,
    pub start_price: Money,
    pub min_bid_price: Money,
    pub buy_now_price: Option<Money>,
    pub deposit_amount: Money,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,

    /// Initial status; defaults to `Scheduled`
    pub status: Option<AuctionStatus>,
}

impl AuctionSpec {
    /// Validates the price rule and the time window.
    ///
    /// Invariant: min_bid_price <= start_price <= buy_now_price (when set),
    /// and starts_at < ends_at.
    pub fn validate(&self) -> Result<()> {
        if self.min_bid_price > self.start_price {
            return Err(Error::InvalidAuctionPriceRule(
                "minimum bid price exceeds the start price".to_string(),
            ));
        }
        if let Some(buy_now) = self.buy_now_price {
            if self.start_price > buy_now {
                return Err(Error::InvalidAuctionPriceRule(
                    "start price exceeds the buy-now price".to_string(),
                ));
            }
        }
        if self.starts_at >= self.ends_at {
            return Err(Error::InvalidAuctionTimeRange(
                "the start must come before the end".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_spec() -> AuctionSpec {
        let now = Utc::now();
        AuctionSpec {
            id: None,
            product_id: ProductId(1),
            start_price: Money::new(50_000),
            min_bid_price: Money::new(50_000),
            buy_now_price: Some(Money::new(200_000)),
            deposit_amount: Money::new(10_000),
            starts_at: now,
            ends_at: now + Duration::days(5),
            status: None,
        }
    }

    #[test]
    fn test_spec_validation_success() {
        assert!(base_spec().validate().is_ok());
    }

    #[test]
    fn test_spec_rejects_min_bid_above_start_price() {
        let mut spec = base_spec();
        spec.min_bid_price = Money::new(60_000);
        assert!(matches!(
            spec.validate(),
            Err(Error::InvalidAuctionPriceRule(_))
        ));
    }

    #[test]
    fn test_spec_rejects_start_price_above_buy_now() {
        let mut spec = base_spec();
        spec.buy_now_price = Some(Money::new(40_000));
        assert!(matches!(
            spec.validate(),
            Err(Error::InvalidAuctionPriceRule(_))
        ));
    }

    #[test]
    fn test_spec_rejects_inverted_time_window() {
        let mut spec = base_spec();
        spec.ends_at = spec.starts_at;
        assert!(matches!(
            spec.validate(),
            Err(Error::InvalidAuctionTimeRange(_))
        ));
    }

    #[test]
    fn test_window_and_settlement_due() {
        let now = Utc::now();
        let auction = Auction {
            id: AuctionId(1),
            product_id: ProductId(1),
            start_price: Money::new(50_000),
            min_bid_price: Money::new(50_000),
            buy_now_price: None,
            deposit_amount: Money::ZERO,
            starts_at: now - Duration::hours(2),
            ends_at: now - Duration::hours(1),
            status: AuctionStatus::Running,
            created_at: now,
            updated_at: now,
        };
        assert!(!auction.window_contains(now));
        assert!(auction.is_due_for_settlement(now));
        assert!(!AuctionStatus::Running.is_terminal());
        assert!(AuctionStatus::Cancelled.is_terminal());
    }
}
