//! Billing Trigger
//!
//! Creates the invoice for an order the first time it reaches `SERVED`.
//! Idempotent: the unique key on `invoices.order_id` decides concurrent
//! races, and the loser returns the winner's invoice.

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::models::{Invoice, Order};

use super::error::OrderResult;
use super::money::tax_for;
use crate::db::repository::InvoiceRepository;
use crate::db::repository::invoice::NewInvoice;
use crate::db::{RecordStore, StoreError};

#[derive(Debug, Clone)]
pub struct BillingTrigger {
    invoices: InvoiceRepository,
    tax_rate: Decimal,
}

impl BillingTrigger {
    pub fn new(store: Arc<dyn RecordStore>, tax_rate: Decimal) -> Self {
        Self {
            invoices: InvoiceRepository::new(store),
            tax_rate,
        }
    }

    pub async fn find(&self, order_id: &str) -> OrderResult<Option<Invoice>> {
        Ok(self.invoices.find_by_order(order_id).await?)
    }

    /// Return the order's invoice, creating it if absent
    pub async fn on_served(&self, order: &Order) -> OrderResult<Invoice> {
        if let Some(existing) = self.invoices.find_by_order(&order.id).await? {
            tracing::debug!(order_id = %order.id, invoice_id = %existing.id, "Invoice already exists");
            return Ok(existing);
        }

        let subtotal = order.total_amount;
        let tax = tax_for(subtotal, self.tax_rate);
        let invoice = NewInvoice {
            order_id: order.id.clone(),
            restaurant_id: order.restaurant_id.clone(),
            subtotal,
            tax,
            total: subtotal + tax,
            created_at: shared::util::now(),
        };

        match self.invoices.create(&invoice).await {
            Ok(created) => {
                tracing::info!(
                    order_id = %order.id,
                    invoice_id = %created.id,
                    total = %created.total,
                    "Invoice created"
                );
                Ok(created)
            }
            Err(StoreError::UniqueViolation { .. }) => {
                tracing::debug!(order_id = %order.id, "Concurrent invoice creation, reading winner");
                match self.invoices.find_by_order(&order.id).await? {
                    Some(winner) => Ok(winner),
                    None => Err(StoreError::Rejected(format!(
                        "invoice for order {} conflicted but cannot be read",
                        order.id
                    ))
                    .into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Collection, MemoryStore};
    use crate::orders::money::money_eq;
    use crate::orders::test_support::FlakyStore;
    use shared::models::OrderStatus;

    fn served_order(total: Decimal) -> Order {
        Order {
            id: "o1".into(),
            restaurant_id: "r1".into(),
            table_number: "2".into(),
            waiter_id: "w1".into(),
            status: OrderStatus::Served,
            total_amount: total,
            created_at: shared::util::now(),
        }
    }

    fn rate() -> Decimal {
        Decimal::new(10, 2)
    }

    #[tokio::test]
    async fn test_creates_tax_inclusive_invoice() {
        let store = Arc::new(MemoryStore::new());
        let billing = BillingTrigger::new(store.clone(), rate());

        let invoice = billing
            .on_served(&served_order(Decimal::new(2550, 2)))
            .await
            .unwrap();
        assert_eq!(invoice.subtotal, Decimal::new(2550, 2));
        assert_eq!(invoice.tax, Decimal::new(255, 2));
        assert_eq!(invoice.total, Decimal::new(2805, 2));
        assert_eq!(store.count(Collection::Invoices), 1);
    }

    #[tokio::test]
    async fn test_second_call_returns_existing() {
        let store = Arc::new(MemoryStore::new());
        let billing = BillingTrigger::new(store.clone(), rate());
        let order = served_order(Decimal::new(1999, 2));

        let first = billing.on_served(&order).await.unwrap();
        let second = billing.on_served(&order).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(money_eq(second.total, Decimal::new(2199, 2)));
        assert_eq!(store.count(Collection::Invoices), 1);
    }

    #[tokio::test]
    async fn test_concurrent_insert_returns_winner() {
        let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
        flaky.race_next_invoice_insert();
        let billing = BillingTrigger::new(flaky.clone(), rate());

        let invoice = billing
            .on_served(&served_order(Decimal::new(1000, 2)))
            .await
            .unwrap();
        assert_eq!(invoice.order_id, "o1");
        assert!(money_eq(invoice.total, Decimal::new(1100, 2)));
        assert_eq!(flaky.inner().count(Collection::Invoices), 1);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
        flaky.fail_inserts_into(Collection::Invoices);
        let billing = BillingTrigger::new(flaky.clone(), rate());

        assert!(
            billing
                .on_served(&served_order(Decimal::new(1000, 2)))
                .await
                .is_err()
        );
        assert_eq!(flaky.inner().count(Collection::Invoices), 0);
    }
}
