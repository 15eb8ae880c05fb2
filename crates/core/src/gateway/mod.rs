pub mod dummy;

pub use dummy::{DummyOrderGateway, DummyPaymentGateway, TracingNotificationSink};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Money, OrderId, PaymentId, ProductId, UserId};
use crate::Result;

/// Provider routed to when the caller has no preference.
pub const DEFAULT_PROVIDER: &str = "dummy";

/// Refund reference handed back by the payment gateway
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RefundId(pub u64);

/// Result of an order + payment checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkout {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
}

/// Payment gateway collaborator. The engine only captures and refunds;
/// gateway protocol details stay behind this seam.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Captures `amount` from the user and returns the payment reference.
    async fn charge(&self, user_id: UserId, amount: Money, provider: &str) -> Result<PaymentId>;

    /// Returns `amount` against a previously captured payment.
    async fn refund(&self, payment_id: PaymentId, amount: Money) -> Result<RefundId>;
}

/// Notification delivery collaborator. Delivery is best-effort and never
/// part of a financial commit.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(
        &self,
        user_id: UserId,
        title: &str,
        body: &str,
        product_id: Option<ProductId>,
    ) -> Result<()>;
}

/// Order collaborator used by buy-now and finalize: creates the order and
/// captures its payment in one step.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn checkout(
        &self,
        user_id: UserId,
        product_id: ProductId,
        unit_price: Money,
    ) -> Result<Checkout>;

    /// Flags the product as sold in the catalog.
    async fn mark_product_sold(&self, product_id: ProductId) -> Result<()>;
}
