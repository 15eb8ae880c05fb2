pub mod admin;
pub mod bidding;
pub mod domain;
pub mod gateway;
pub mod ladder;
pub mod lifecycle;
pub mod notify;
pub mod settlement;
pub mod store;

pub use admin::AdminService;
pub use bidding::{AuctionService, BidBoard, BidResult, BuyNowResult};
pub use domain::{Auction, AuctionSpec, AuctionStatus, Money};
pub use lifecycle::LifecycleScheduler;
pub use notify::OutboxWorker;
pub use settlement::{FinalizeResult, SettlementEngine};
pub use store::MemoryStore;

/// Core result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Business errors surfaced to callers as 400-class responses, distinct
/// from unexpected transport or internal failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("auction not found")]
    AuctionNotFound,

    #[error("auction is not running")]
    AuctionNotRunning,

    #[error("bid not allowed: {0}")]
    BidNotAllowed(String),

    #[error("user already holds a bid on this auction")]
    BidAlreadyExists,

    #[error("buy-now not allowed: {0}")]
    BuyNotAllowed(String),

    #[error("invalid auction status: {0}")]
    InvalidAuctionStatus(String),

    #[error("invalid auction price rule: {0}")]
    InvalidAuctionPriceRule(String),

    #[error("invalid auction time range: {0}")]
    InvalidAuctionTimeRange(String),

    #[error("product already has an auction")]
    ProductAlreadyHasAuction,

    #[error("only a running auction can be cancelled")]
    CannotCancelNonRunning,

    #[error("auction can only resume inside its time window")]
    CannotResumeExpiredAuction,

    #[error("no winning bid found")]
    WinnerNotFound,

    #[error("payment failed: {0}")]
    PaymentFailed(String),

    #[error("notification delivery failed: {0}")]
    NotificationFailed(String),
}

impl Error {
    /// Stable wire code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            Error::AuctionNotFound => "AUCTION_NOT_FOUND",
            Error::AuctionNotRunning => "AUCTION_NOT_RUNNING",
            Error::BidNotAllowed(_) => "BID_NOT_ALLOWED",
            Error::BidAlreadyExists => "BID_ALREADY_EXISTS",
            Error::BuyNotAllowed(_) => "BUY_NOT_ALLOWED",
            Error::InvalidAuctionStatus(_) => "INVALID_AUCTION_STATUS",
            Error::InvalidAuctionPriceRule(_) => "INVALID_AUCTION_PRICE_RULE",
            Error::InvalidAuctionTimeRange(_) => "INVALID_AUCTION_TIME_RANGE",
            Error::ProductAlreadyHasAuction => "PRODUCT_ALREADY_HAS_AUCTION",
            Error::CannotCancelNonRunning => "CANNOT_CANCEL_NON_RUNNING",
            Error::CannotResumeExpiredAuction => "CANNOT_RESUME_EXPIRED_AUCTION",
            Error::WinnerNotFound => "WINNER_NOT_FOUND",
            Error::PaymentFailed(_) => "PAYMENT_FAILED",
            Error::NotificationFailed(_) => "NOTIFICATION_FAILED",
        }
    }
}
