//! Order Status History Repository (append-only)

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::models::{OrderStatus, OrderStatusHistory};

use super::BaseRepository;
use crate::db::{Collection, Filter, RecordStore, SortOrder, StoreResult};

#[derive(Debug, Clone, Serialize)]
pub struct NewStatusHistory {
    pub order_id: String,
    pub status: OrderStatus,
    pub changed_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StatusHistoryRepository {
    base: BaseRepository,
}

impl StatusHistoryRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            base: BaseRepository::new(store, Collection::OrderStatusHistory),
        }
    }

    /// No update/delete counterpart exists.
    pub async fn append(&self, entry: &NewStatusHistory) -> StoreResult<OrderStatusHistory> {
        let record = self.base.encode(entry)?;
        let id = self
            .base
            .store()
            .insert(self.base.collection(), record)
            .await?;
        Ok(OrderStatusHistory {
            id,
            order_id: entry.order_id.clone(),
            status: entry.status,
            changed_by: entry.changed_by.clone(),
            created_at: entry.created_at,
        })
    }

    /// Oldest first
    pub async fn find_by_order(&self, order_id: &str) -> StoreResult<Vec<OrderStatusHistory>> {
        let filter = Filter::new()
            .eq("order_id", order_id)
            .order_by("created_at", SortOrder::Asc);
        let rows = self.base.store().fetch(self.base.collection(), &filter).await?;
        self.base.decode_all(rows)
    }
}
