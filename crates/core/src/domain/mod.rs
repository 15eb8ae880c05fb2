pub mod auction;
pub mod bid;
pub mod deposit;
pub mod money;
pub mod offer;

pub use auction::{Auction, AuctionId, AuctionSpec, AuctionStatus, ProductId};
pub use bid::{Bid, BidId};
pub use deposit::{AuctionDeposit, DepositId, DepositStatus};
pub use money::Money;
pub use offer::{AuctionOffer, BuyNowReceipt, OfferId, OfferStatus};

use serde::{Deserialize, Serialize};

/// Bidder / buyer identifier, owned by the user domain (out of scope here)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

/// Payment reference handed back by the payment gateway
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PaymentId(pub u64);

/// Order reference handed back by the order collaborator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct OrderId(pub u64);
