//! Order Store Gateway
//!
//! The store has no multi-record transactions, so creation is a two-phase
//! write: header first, then every line item in one bulk insert. If the
//! items cannot be written the header is deleted again (two attempts).

use std::sync::Arc;

use shared::models::{Order, OrderItem, OrderStatus};

use super::audit::AuditLogger;
use super::builder::OrderDraft;
use super::error::{OrderError, OrderResult};
use super::Actor;
use crate::db::repository::order::NewOrder;
use crate::db::repository::order_item::NewOrderItem;
use crate::db::repository::{OrderItemRepository, OrderRepository};
use crate::db::{RecordStore, StoreError};

/// Compensating delete attempts before reporting a consistency fault
const COMPENSATION_ATTEMPTS: usize = 2;

#[derive(Debug, Clone)]
pub struct OrderGateway {
    orders: OrderRepository,
    items: OrderItemRepository,
    audit: AuditLogger,
}

impl OrderGateway {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditLogger) -> Self {
        Self {
            orders: OrderRepository::new(store.clone()),
            items: OrderItemRepository::new(store),
            audit,
        }
    }

    /// Persist a draft as a `CREATED` order and record the creation
    pub async fn persist(
        &self,
        draft: OrderDraft,
        actor: &Actor,
    ) -> OrderResult<(Order, Vec<OrderItem>)> {
        let header = NewOrder {
            restaurant_id: draft.restaurant_id,
            table_number: draft.table_number,
            waiter_id: draft.waiter_id,
            status: OrderStatus::Created,
            total_amount: draft.total_amount,
            created_at: shared::util::now(),
        };
        let order = self.orders.create(&header).await?;

        let new_items: Vec<NewOrderItem> = draft
            .items
            .into_iter()
            .map(|item| NewOrderItem {
                order_id: order.id.clone(),
                position: item.position,
                menu_item_id: item.menu_item_id,
                name: item.name,
                price: item.price,
                quantity: item.quantity,
                notes: item.notes,
            })
            .collect();

        let items = match self.items.create_many(&new_items).await {
            Ok(items) => items,
            Err(write_err) => return Err(self.compensate(&order.id, write_err).await),
        };

        self.audit
            .record(&order.id, OrderStatus::Created, actor)
            .await;

        tracing::info!(
            order_id = %order.id,
            table_number = %order.table_number,
            items = items.len(),
            total = %order.total_amount,
            "Order created"
        );
        Ok((order, items))
    }

    /// Remove an orphaned header after a failed line-item write
    async fn compensate(&self, order_id: &str, write_err: StoreError) -> OrderError {
        tracing::warn!(
            order_id = %order_id,
            error = %write_err,
            "Line item write failed, removing order header"
        );

        for attempt in 1..=COMPENSATION_ATTEMPTS {
            match self.orders.delete(order_id).await {
                Ok(_) => return OrderError::Store(write_err),
                Err(e) => tracing::warn!(
                    order_id = %order_id,
                    attempt,
                    error = %e,
                    "Compensating delete failed"
                ),
            }
        }

        tracing::error!(
            target: "consistency",
            order_id = %order_id,
            error = %write_err,
            "Order header persisted without line items"
        );
        OrderError::ConsistencyFault {
            order_id: order_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Collection, MemoryStore};
    use crate::orders::builder::LineItemDraft;
    use crate::orders::test_support::FlakyStore;
    use rust_decimal::Decimal;
    use shared::models::StaffRole;

    fn draft() -> OrderDraft {
        OrderDraft {
            restaurant_id: "r1".into(),
            table_number: "4".into(),
            waiter_id: "w1".into(),
            items: vec![
                LineItemDraft {
                    position: 0,
                    menu_item_id: "m1".into(),
                    name: "Soup".into(),
                    price: Decimal::new(1000, 2),
                    quantity: 2,
                    notes: None,
                },
                LineItemDraft {
                    position: 1,
                    menu_item_id: "m2".into(),
                    name: "Bread".into(),
                    price: Decimal::new(550, 2),
                    quantity: 1,
                    notes: Some("toasted".into()),
                },
            ],
            total_amount: Decimal::new(2550, 2),
        }
    }

    fn gateway(store: Arc<dyn RecordStore>) -> OrderGateway {
        OrderGateway::new(store.clone(), AuditLogger::new(store))
    }

    fn waiter() -> Actor {
        Actor::new("w1", StaffRole::Waiter)
    }

    #[tokio::test]
    async fn test_persist_writes_header_items_and_history() {
        let store = Arc::new(MemoryStore::new());
        let (order, items) = gateway(store.clone())
            .persist(draft(), &waiter())
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.total_amount, Decimal::new(2550, 2));
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.order_id == order.id));
        assert_eq!(store.count(Collection::Orders), 1);
        assert_eq!(store.count(Collection::OrderItems), 2);
        assert_eq!(store.count(Collection::OrderStatusHistory), 1);
    }

    #[tokio::test]
    async fn test_item_failure_removes_header() {
        let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
        flaky.fail_inserts_into(Collection::OrderItems);

        let err = gateway(flaky.clone())
            .persist(draft(), &waiter())
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Store(StoreError::Unavailable(_))));
        assert_eq!(flaky.inner().count(Collection::Orders), 0);
        assert_eq!(flaky.inner().count(Collection::OrderItems), 0);
        assert_eq!(flaky.inner().count(Collection::OrderStatusHistory), 0);
        assert_eq!(flaky.delete_attempts(), 1);
    }

    #[tokio::test]
    async fn test_compensation_retries_once() {
        let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
        flaky.fail_inserts_into(Collection::OrderItems);
        flaky.fail_next_deletes(1);

        let err = gateway(flaky.clone())
            .persist(draft(), &waiter())
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Store(_)));
        assert_eq!(flaky.delete_attempts(), 2);
        assert_eq!(flaky.inner().count(Collection::Orders), 0);
    }

    #[tokio::test]
    async fn test_double_delete_failure_is_consistency_fault() {
        let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
        flaky.fail_inserts_into(Collection::OrderItems);
        flaky.fail_next_deletes(2);

        let err = gateway(flaky.clone())
            .persist(draft(), &waiter())
            .await
            .unwrap_err();

        match err {
            OrderError::ConsistencyFault { order_id } => {
                assert!(!order_id.is_empty());
                assert_eq!(flaky.inner().count(Collection::Orders), 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(flaky.delete_attempts(), 2);
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_fail_creation() {
        let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
        flaky.fail_inserts_into(Collection::OrderStatusHistory);

        let (order, _) = gateway(flaky.clone())
            .persist(draft(), &waiter())
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(flaky.inner().count(Collection::Orders), 1);
    }
}
