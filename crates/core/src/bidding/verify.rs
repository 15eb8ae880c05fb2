use crate::domain::{Auction, AuctionId, Money, UserId};
use crate::ladder;
use crate::store::MemoryStore;
use crate::{Error, Result};

/// Validates a bid attempt against the auction state, the ladder and the
/// existing bid book. Run under the auction lock so every check sees the
/// snapshot that accepted the previous bid.
pub struct BidVerifier<'a> {
    store: &'a MemoryStore,
}

impl<'a> BidVerifier<'a> {
    pub fn new(store: &'a MemoryStore) -> Self {
        Self { store }
    }

    /// Read-surface variant: the auction must exist and be running.
    pub async fn ensure_running(&self, auction_id: AuctionId) -> Result<Auction> {
        let auction = self
            .store
            .get_auction(auction_id)
            .await
            .ok_or(Error::AuctionNotFound)?;
        if !auction.is_running() {
            return Err(Error::AuctionNotRunning);
        }
        Ok(auction)
    }

    /// Bid-path variant: same guard, surfaced as a bid rejection.
    pub async fn ensure_biddable(&self, auction_id: AuctionId) -> Result<Auction> {
        let auction = self
            .store
            .get_auction(auction_id)
            .await
            .ok_or(Error::AuctionNotFound)?;
        if !auction.is_running() {
            return Err(Error::BidNotAllowed("auction is not running".to_string()));
        }
        Ok(auction)
    }

    /// The amount must land exactly on a ladder rung above the current
    /// highest bid (or the minimum bid price while the book is empty).
    /// Returns the deposit the auction requires.
    pub async fn ensure_amount_allowed(&self, auction: &Auction, amount: Money) -> Result<Money> {
        let info = self
            .store
            .auction_info(auction.id)
            .await
            .ok_or(Error::AuctionNotFound)?;
        let steps = ladder::rungs(
            info.ladder_base(),
            info.auction.buy_now_price,
            ladder::VERIFY_RUNGS,
        );
        if !steps.contains(&amount) {
            return Err(Error::BidNotAllowed(
                "amount is not a legal bid step".to_string(),
            ));
        }
        Ok(auction.deposit_amount)
    }

    /// Single-claim rule: one bid per user per auction.
    pub async fn ensure_not_already_bid(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
    ) -> Result<()> {
        if self.store.find_bid(auction_id, user_id).await.is_some() {
            return Err(Error::BidAlreadyExists);
        }
        Ok(())
    }

    /// Buy-now requires a running auction with a configured price. Returns
    /// that price.
    pub fn verify_buy_now(&self, auction: &Auction) -> Result<Money> {
        if !auction.is_running() {
            return Err(Error::BuyNotAllowed("auction is not running".to_string()));
        }
        auction
            .buy_now_price
            .ok_or_else(|| Error::BuyNotAllowed("buy-now price is not set".to_string()))
    }
}
