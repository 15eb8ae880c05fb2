pub mod verify;

pub use verify::BidVerifier;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{
    Auction, AuctionId, Bid, BidId, BuyNowReceipt, Money, OrderId, PaymentId, UserId,
};
use crate::gateway::{Checkout, OrderGateway, PaymentGateway, DEFAULT_PROVIDER};
use crate::ladder;
use crate::store::{BidCommit, DepositCommit, MemoryStore, NotificationDraft};
use crate::{Error, Result};

/// Outcome of an accepted bid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BidResult {
    pub bid_id: BidId,
    pub amount: Money,
}

/// Outcome of a buy-now purchase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuyNowResult {
    pub status: String,
    pub order_id: OrderId,
    pub payment_id: PaymentId,
}

/// Read-only bidding board consumed by catalog display code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidBoard {
    pub auction_id: AuctionId,
    pub current_highest: Option<Money>,
    pub bidder_count: usize,
    pub next_rungs: Vec<Money>,
    pub history: Vec<Bid>,
}

/// Bid placement and buy-now execution.
///
/// Holds the per-auction lock across verify and commit, so two bids on the
/// same auction serialize while different auctions proceed in parallel.
pub struct AuctionService {
    store: Arc<MemoryStore>,
    payments: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderGateway>,
}

impl AuctionService {
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

    /// Places a bid on a running auction.
    ///
    /// Check order matters: existence and eligibility come before the
    /// uniqueness check, so a missing auction never leaks a duplicate-bid
    /// error. When the auction requires a deposit it is captured first and
    /// committed together with the bid; the notifications ride the same
    /// commit as durable intents.
    pub async fn place_bid(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
        amount: Money,
    ) -> Result<BidResult> {
        let _guard = self.store.lock_auction(auction_id).await;

        let verifier = BidVerifier::new(&self.store);
        let auction = verifier.ensure_biddable(auction_id).await?;
        let deposit_amount = verifier.ensure_amount_allowed(&auction, amount).await?;
        verifier.ensure_not_already_bid(auction_id, user_id).await?;

        let deposit = if deposit_amount.is_positive() {
            let payment_id = self
                .payments
                .charge(user_id, deposit_amount, DEFAULT_PROVIDER)
                .await?;
            info!(
                auction = auction_id.0,
                user = user_id.0,
                amount = deposit_amount.units(),
                payment = payment_id.0,
                "captured bid deposit"
            );
            Some(DepositCommit {
                payment_id,
                amount: deposit_amount,
            })
        } else {
            None
        };

        let mut notifications = vec![NotificationDraft {
            user_id,
            title: "Bid accepted".to_string(),
            body: format!("You are the highest bidder at {}.", amount),
            product_id: Some(auction.product_id),
        }];
        for outbid in self.store.distinct_bidders(auction_id).await {
            if outbid != user_id {
                notifications.push(NotificationDraft {
                    user_id: outbid,
                    title: "You have been outbid".to_string(),
                    body: format!("A new highest bid of {} was placed.", amount),
                    product_id: Some(auction.product_id),
                });
            }
        }

        let bid = self
            .store
            .commit_bid(BidCommit {
                auction_id,
                user_id,
                amount,
                deposit,
                notifications,
            })
            .await?;
        info!(
            auction = auction_id.0,
            user = user_id.0,
            bid = bid.id.0,
            amount = amount.units(),
            "accepted bid"
        );
        Ok(BidResult {
            bid_id: bid.id,
            amount: bid.amount,
        })
    }

    /// Ends the auction instantly at its buy-now price.
    ///
    /// Two commits on purpose: the order + payment capture must not be
    /// rolled back by a later status or notification failure. The receipt
    /// written with the checkout lets the recovery sweep close any auction
    /// left running between the two.
    pub async fn buy_now(&self, auction_id: AuctionId, user_id: UserId) -> Result<BuyNowResult> {
        let _guard = self.store.lock_auction(auction_id).await;

        let auction = self
            .store
            .get_auction(auction_id)
            .await
            .ok_or(Error::AuctionNotFound)?;
        let verifier = BidVerifier::new(&self.store);
        let price = verifier.verify_buy_now(&auction)?;

        // commit 1: order + payment, plus the receipt
        let checkout = self
            .orders
            .checkout(user_id, auction.product_id, price)
            .await?;
        self.store
            .push_receipt(BuyNowReceipt {
                auction_id,
                user_id,
                order_id: checkout.order_id,
                payment_id: checkout.payment_id,
                completed: false,
                created_at: Utc::now(),
            })
            .await;
        info!(
            auction = auction_id.0,
            user = user_id.0,
            order = checkout.order_id.0,
            price = price.units(),
            "buy-now checkout captured"
        );

        // commit 2: close out the auction
        self.complete_buy_now(&auction, user_id, &checkout).await?;

        Ok(BuyNowResult {
            status: "ORDER_PLACED".to_string(),
            order_id: checkout.order_id,
            payment_id: checkout.payment_id,
        })
    }

    /// Re-drives the close-out for auctions whose buy-now payment landed
    /// but whose status flip never did.
    pub async fn run_buy_now_recovery(&self) -> usize {
        let mut recovered = 0;
        for receipt in self.store.open_receipts().await {
            let _guard = self.store.lock_auction(receipt.auction_id).await;
            let Some(auction) = self.store.get_auction(receipt.auction_id).await else {
                continue;
            };
            if !auction.is_running() {
                // status already flipped; just retire the receipt
                if let Err(err) = self
                    .store
                    .commit_buy_now_close(receipt.auction_id, Vec::new())
                    .await
                {
                    warn!(auction = receipt.auction_id.0, error = %err, "failed to retire buy-now receipt");
                }
                continue;
            }
            warn!(
                auction = receipt.auction_id.0,
                order = receipt.order_id.0,
                "completed buy-now payment found on a running auction; recovering"
            );
            let checkout = Checkout {
                order_id: receipt.order_id,
                payment_id: receipt.payment_id,
            };
            match self
                .complete_buy_now(&auction, receipt.user_id, &checkout)
                .await
            {
                Ok(()) => recovered += 1,
                Err(err) => {
                    warn!(auction = receipt.auction_id.0, error = %err, "buy-now recovery failed; will retry next sweep");
                }
            }
        }
        recovered
    }

    /// Second buy-now commit: flips the auction to ENDED, marks the product
    /// sold and stages the close-out notices.
    async fn complete_buy_now(
        &self,
        auction: &Auction,
        buyer: UserId,
        checkout: &Checkout,
    ) -> Result<()> {
        let mut notifications: Vec<NotificationDraft> = self
            .store
            .distinct_bidders(auction.id)
            .await
            .into_iter()
            .filter(|uid| *uid != buyer)
            .map(|uid| NotificationDraft {
                user_id: uid,
                title: "Auction ended".to_string(),
                body: "The auction was closed by a buy-now purchase.".to_string(),
                product_id: Some(auction.product_id),
            })
            .collect();
        notifications.push(NotificationDraft {
            user_id: buyer,
            title: "Order placed".to_string(),
            body: "Your buy-now order has been placed.".to_string(),
            product_id: Some(auction.product_id),
        });

        // TODO: refund deposits held by earlier bidders when an auction
        // closes by buy-now; today they wait for a manual refund.
        self.orders.mark_product_sold(auction.product_id).await?;
        self.store
            .commit_buy_now_close(auction.id, notifications)
            .await?;
        info!(auction = auction.id.0, buyer = buyer.0, order = checkout.order_id.0, "auction ended by buy-now");
        Ok(())
    }

    /// Current bidding board for one running auction.
    pub async fn bid_board(&self, auction_id: AuctionId) -> Result<BidBoard> {
        let verifier = BidVerifier::new(&self.store);
        verifier.ensure_running(auction_id).await?;
        let info = self
            .store
            .auction_info(auction_id)
            .await
            .ok_or(Error::AuctionNotFound)?;
        let next_rungs = ladder::rungs(
            info.ladder_base(),
            info.auction.buy_now_price,
            ladder::DISPLAY_RUNGS,
        );
        Ok(BidBoard {
            auction_id,
            current_highest: info.current_highest,
            bidder_count: info.bidder_count,
            next_rungs,
            history: self.store.bids_for(auction_id).await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuctionSpec, AuctionStatus, DepositStatus, ProductId};
    use crate::gateway::{DummyOrderGateway, DummyPaymentGateway};
    use chrono::Duration;

    struct Fixture {
        store: Arc<MemoryStore>,
        payments: Arc<DummyPaymentGateway>,
        orders: Arc<DummyOrderGateway>,
        service: AuctionService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let payments = Arc::new(DummyPaymentGateway::new());
        let orders = Arc::new(DummyOrderGateway::new());
        let service = AuctionService::new(store.clone(), payments.clone(), orders.clone());
        Fixture {
            store,
            payments,
            orders,
            service,
        }
    }

    async fn running_auction(
        store: &MemoryStore,
        product: u64,
        buy_now: Option<i64>,
        deposit: i64,
    ) -> Auction {
        let now = Utc::now();
        store
            .upsert_auction(
                &AuctionSpec {
                    id: None,
                    product_id: ProductId(product),
                    start_price: Money::new(50_000),
                    min_bid_price: Money::new(50_000),
                    buy_now_price: buy_now.map(Money::new),
                    deposit_amount: Money::new(deposit),
                    starts_at: now - Duration::hours(1),
                    ends_at: now + Duration::days(5),
                    status: Some(AuctionStatus::Running),
                },
                now,
            )
            .await
    }

    #[tokio::test]
    async fn test_place_bid_charges_deposit_and_commits_together() {
        let f = fixture();
        let auction = running_auction(&f.store, 1, Some(200_000), 10_000).await;

        let result = f
            .service
            .place_bid(auction.id, UserId(1), Money::new(55_000))
            .await
            .unwrap();
        assert_eq!(result.amount, Money::new(55_000));
        assert_eq!(f.payments.charge_count(), 1);

        let deposits = f.store.deposits_for(auction.id).await;
        assert_eq!(deposits.len(), 1);
        assert_eq!(deposits[0].status, DepositStatus::Paid);
        assert_eq!(deposits[0].amount, Money::new(10_000));
        assert!(deposits[0].payment_id.is_some());

        // one "highest bidder" notice, nobody to outbid yet
        assert_eq!(f.store.undelivered_intents().await.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_deposit_auction_skips_the_gateway() {
        let f = fixture();
        let auction = running_auction(&f.store, 1, None, 0).await;

        f.service
            .place_bid(auction.id, UserId(1), Money::new(55_000))
            .await
            .unwrap();
        assert_eq!(f.payments.charge_count(), 0);
        assert!(f.store.deposits_for(auction.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_claimed_rung_and_second_bid_are_rejected() {
        let f = fixture();
        let auction = running_auction(&f.store, 1, Some(200_000), 10_000).await;

        f.service
            .place_bid(auction.id, UserId(1), Money::new(55_000))
            .await
            .unwrap();

        // the rung is taken: the ladder now starts at 55,000
        let err = f
            .service
            .place_bid(auction.id, UserId(2), Money::new(55_000))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BidNotAllowed(_)));

        // and user 1 only ever gets one claim
        let err = f
            .service
            .place_bid(auction.id, UserId(1), Money::new(60_000))
            .await
            .unwrap_err();
        assert_eq!(err, Error::BidAlreadyExists);
    }

    #[tokio::test]
    async fn test_outbid_notices_reach_previous_bidders() {
        let f = fixture();
        let auction = running_auction(&f.store, 1, None, 0).await;

        f.service
            .place_bid(auction.id, UserId(1), Money::new(55_000))
            .await
            .unwrap();
        f.service
            .place_bid(auction.id, UserId(2), Money::new(60_000))
            .await
            .unwrap();

        let intents = f.store.undelivered_intents().await;
        // bid 1: highest notice; bid 2: highest notice + outbid notice
        assert_eq!(intents.len(), 3);
        assert!(intents
            .iter()
            .any(|i| i.user_id == UserId(1) && i.title == "You have been outbid"));
    }

    #[tokio::test]
    async fn test_bid_requires_running_auction() {
        let f = fixture();
        assert_eq!(
            f.service
                .place_bid(AuctionId(99), UserId(1), Money::new(55_000))
                .await
                .unwrap_err(),
            Error::AuctionNotFound
        );

        let auction = running_auction(&f.store, 1, None, 0).await;
        f.store
            .set_status(auction.id, AuctionStatus::Paused, Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            f.service
                .place_bid(auction.id, UserId(1), Money::new(55_000))
                .await
                .unwrap_err(),
            Error::BidNotAllowed(_)
        ));
        assert_eq!(f.payments.charge_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bids_on_one_rung_admit_exactly_one() {
        let f = fixture();
        let auction = running_auction(&f.store, 1, Some(200_000), 10_000).await;
        let service = Arc::new(f.service);

        let mut handles = Vec::new();
        for user in 1..=8u64 {
            let service = service.clone();
            let auction_id = auction.id;
            handles.push(tokio::spawn(async move {
                service
                    .place_bid(auction_id, UserId(user), Money::new(55_000))
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.expect("task panicked") {
                Ok(_) => successes += 1,
                Err(Error::BidNotAllowed(_)) | Err(Error::BidAlreadyExists) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(f.store.bids_for(auction.id).await.len(), 1);
        assert_eq!(f.payments.charge_count(), 1);
    }

    #[tokio::test]
    async fn test_buy_now_ends_auction_and_notifies() {
        let f = fixture();
        let auction = running_auction(&f.store, 7, Some(200_000), 10_000).await;
        f.service
            .place_bid(auction.id, UserId(1), Money::new(55_000))
            .await
            .unwrap();

        let result = f.service.buy_now(auction.id, UserId(2)).await.unwrap();
        assert_eq!(result.status, "ORDER_PLACED");
        assert_eq!(f.orders.order_count(), 1);
        assert!(f.orders.is_sold(ProductId(7)));

        let closed = f.store.get_auction(auction.id).await.unwrap();
        assert_eq!(closed.status, AuctionStatus::Ended);
        assert!(f.store.open_receipts().await.is_empty());

        let intents = f.store.undelivered_intents().await;
        assert!(intents
            .iter()
            .any(|i| i.user_id == UserId(1) && i.title == "Auction ended"));
        assert!(intents
            .iter()
            .any(|i| i.user_id == UserId(2) && i.title == "Order placed"));
    }

    #[tokio::test]
    async fn test_buy_now_without_price_writes_nothing() {
        let f = fixture();
        let auction = running_auction(&f.store, 1, None, 0).await;

        let err = f.service.buy_now(auction.id, UserId(2)).await.unwrap_err();
        assert!(matches!(err, Error::BuyNotAllowed(_)));
        assert_eq!(f.orders.order_count(), 0);
        assert_eq!(f.store.outbox_len().await, 0);
        assert_eq!(
            f.store.get_auction(auction.id).await.unwrap().status,
            AuctionStatus::Running
        );
    }

    #[tokio::test]
    async fn test_recovery_closes_auction_with_orphaned_receipt() {
        let f = fixture();
        let auction = running_auction(&f.store, 3, Some(200_000), 0).await;

        // simulate a crash between the two buy-now commits
        f.store
            .push_receipt(BuyNowReceipt {
                auction_id: auction.id,
                user_id: UserId(5),
                order_id: OrderId(41),
                payment_id: PaymentId(42),
                completed: false,
                created_at: Utc::now(),
            })
            .await;

        assert_eq!(f.service.run_buy_now_recovery().await, 1);
        let closed = f.store.get_auction(auction.id).await.unwrap();
        assert_eq!(closed.status, AuctionStatus::Ended);
        assert!(f.store.open_receipts().await.is_empty());
        assert!(f.orders.is_sold(ProductId(3)));

        // nothing left to recover
        assert_eq!(f.service.run_buy_now_recovery().await, 0);
    }

    #[tokio::test]
    async fn test_bid_board_reflects_the_book() {
        let f = fixture();
        let auction = running_auction(&f.store, 1, Some(200_000), 0).await;
        f.service
            .place_bid(auction.id, UserId(1), Money::new(55_000))
            .await
            .unwrap();

        let board = f.service.bid_board(auction.id).await.unwrap();
        assert_eq!(board.current_highest, Some(Money::new(55_000)));
        assert_eq!(board.bidder_count, 1);
        assert_eq!(board.next_rungs.first(), Some(&Money::new(60_000)));
        assert_eq!(board.history.len(), 1);
    }
}
