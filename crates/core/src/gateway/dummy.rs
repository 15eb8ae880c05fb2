use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::info;

use super::{Checkout, NotificationSink, OrderGateway, PaymentGateway, RefundId};
use crate::domain::{Money, OrderId, PaymentId, ProductId, UserId};
use crate::Result;

/// One captured payment held by the dummy gateway
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub user_id: UserId,
    pub amount: Money,
    pub provider: String,
    pub status: &'static str,
}

/// Gateway-side audit line, mirroring what a real provider integration
/// would persist per request
#[derive(Debug, Clone)]
pub struct PaymentLogEntry {
    pub payment_id: PaymentId,
    pub provider: String,
    pub amount: Money,
    pub status: &'static str,
    pub log_type: &'static str,
}

/// In-process payment gateway. Every charge succeeds and is recorded with a
/// request log, every refund flips the payment to REFUNDED with a refund
/// log. Backs the daemon wiring and the engine tests.
#[derive(Default)]
pub struct DummyPaymentGateway {
    next_payment: AtomicU64,
    next_refund: AtomicU64,
    payments: Mutex<Vec<PaymentRecord>>,
    logs: Mutex<Vec<PaymentLogEntry>>,
}

impl DummyPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payment(&self, id: PaymentId) -> Option<PaymentRecord> {
        self.payments
            .lock()
            .expect("payments lock")
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn charge_count(&self) -> usize {
        self.payments.lock().expect("payments lock").len()
    }

    pub fn refund_count(&self) -> usize {
        self.logs
            .lock()
            .expect("logs lock")
            .iter()
            .filter(|l| l.log_type == "REFUND")
            .count()
    }
}

#[async_trait]
impl PaymentGateway for DummyPaymentGateway {
    async fn charge(&self, user_id: UserId, amount: Money, provider: &str) -> Result<PaymentId> {
        let id = PaymentId(self.next_payment.fetch_add(1, Ordering::SeqCst) + 1);
        let record = PaymentRecord {
            id,
            user_id,
            amount,
            provider: provider.to_string(),
            status: "PAID",
        };
        self.payments.lock().expect("payments lock").push(record);
        self.logs.lock().expect("logs lock").push(PaymentLogEntry {
            payment_id: id,
            provider: provider.to_string(),
            amount,
            status: "PAID",
            log_type: "REQUEST",
        });
        Ok(id)
    }

    async fn refund(&self, payment_id: PaymentId, amount: Money) -> Result<RefundId> {
        let refund_id = RefundId(self.next_refund.fetch_add(1, Ordering::SeqCst) + 1);
        {
            let mut payments = self.payments.lock().expect("payments lock");
            if let Some(p) = payments.iter_mut().find(|p| p.id == payment_id) {
                p.status = "REFUNDED";
            }
        }
        self.logs.lock().expect("logs lock").push(PaymentLogEntry {
            payment_id,
            provider: super::DEFAULT_PROVIDER.to_string(),
            amount,
            status: "REFUNDED",
            log_type: "REFUND",
        });
        Ok(refund_id)
    }
}

/// In-process order collaborator: checkout charges through its own payment
/// counter and records the order; sold products are tracked by id.
#[derive(Default)]
pub struct DummyOrderGateway {
    next_order: AtomicU64,
    next_payment: AtomicU64,
    orders: Mutex<Vec<(OrderId, UserId, ProductId, Money)>>,
    sold: Mutex<Vec<ProductId>>,
}

impl DummyOrderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().expect("orders lock").len()
    }

    pub fn is_sold(&self, product_id: ProductId) -> bool {
        self.sold.lock().expect("sold lock").contains(&product_id)
    }
}

#[async_trait]
impl OrderGateway for DummyOrderGateway {
    async fn checkout(
        &self,
        user_id: UserId,
        product_id: ProductId,
        unit_price: Money,
    ) -> Result<Checkout> {
        let order_id = OrderId(self.next_order.fetch_add(1, Ordering::SeqCst) + 1);
        let payment_id = PaymentId(self.next_payment.fetch_add(1, Ordering::SeqCst) + 1);
        self.orders
            .lock()
            .expect("orders lock")
            .push((order_id, user_id, product_id, unit_price));
        Ok(Checkout {
            order_id,
            payment_id,
        })
    }

    async fn mark_product_sold(&self, product_id: ProductId) -> Result<()> {
        let mut sold = self.sold.lock().expect("sold lock");
        if !sold.contains(&product_id) {
            sold.push(product_id);
        }
        Ok(())
    }
}

/// Notification sink that only logs. Stands in for the delivery transport
/// in the daemon; tests use recording sinks instead.
#[derive(Default)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn send(
        &self,
        user_id: UserId,
        title: &str,
        body: &str,
        product_id: Option<ProductId>,
    ) -> Result<()> {
        info!(
            user = user_id.0,
            product = product_id.map(|p| p.0),
            title,
            body,
            "notification delivered"
        );
        Ok(())
    }
}
