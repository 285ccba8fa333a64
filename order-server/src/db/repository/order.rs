//! Order Repository
//!
//! Header rows only; line items live in [`super::OrderItemRepository`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use shared::models::{Order, OrderStatus};

use super::BaseRepository;
use crate::db::{Collection, Filter, Record, RecordStore, SortOrder, StoreResult};

/// Insert payload for a new header (id assigned by the store)
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub restaurant_id: String,
    pub table_number: String,
    pub waiter_id: String,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// List query for headers
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Restrict to orders placed by this staff member
    pub waiter_id: Option<String>,
    pub status: Option<OrderStatus>,
    /// Exclude terminal orders
    pub active_only: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            base: BaseRepository::new(store, Collection::Orders),
        }
    }

    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<Order>> {
        self.base.find_by_id(id).await
    }

    /// Newest first
    pub async fn find_all(&self, query: &OrderQuery) -> StoreResult<Vec<Order>> {
        let mut filter = Filter::new().order_by("created_at", SortOrder::Desc);
        if let Some(waiter_id) = &query.waiter_id {
            filter = filter.eq("waiter_id", waiter_id.as_str());
        }
        if let Some(status) = query.status {
            filter = filter.eq("status", status.as_str());
        }
        if query.active_only {
            let terminal = OrderStatus::ALL
                .into_iter()
                .filter(|s| s.is_terminal())
                .map(|s| s.as_str());
            filter = filter.not_in("status", terminal);
        }
        if let Some(limit) = query.limit {
            filter = filter.limit(limit);
        }
        if let Some(offset) = query.offset {
            filter = filter.offset(offset);
        }

        let rows = self.base.store().fetch(self.base.collection(), &filter).await?;
        self.base.decode_all(rows)
    }

    pub async fn create(&self, order: &NewOrder) -> StoreResult<Order> {
        let record = self.base.encode(order)?;
        let id = self
            .base
            .store()
            .insert(self.base.collection(), record)
            .await?;
        Ok(Order {
            id,
            restaurant_id: order.restaurant_id.clone(),
            table_number: order.table_number.clone(),
            waiter_id: order.waiter_id.clone(),
            status: order.status,
            total_amount: order.total_amount,
            created_at: order.created_at,
        })
    }

    /// Compare-and-swap on the status column.
    ///
    /// Returns `false` if the order is gone or its status is no longer
    /// `expected`.
    pub async fn update_status_if(
        &self,
        id: &str,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> StoreResult<bool> {
        let mut changes = Record::new();
        changes.insert("status".to_string(), Value::from(next.as_str()));
        let guard = Filter::new().eq("status", expected.as_str());
        self.base
            .store()
            .update(self.base.collection(), id, changes, Some(&guard))
            .await
    }

    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.base.store().delete(self.base.collection(), id).await
    }
}
