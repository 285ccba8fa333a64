//! Order Item Repository

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::OrderItem;

use super::BaseRepository;
use crate::db::{Collection, Filter, RecordStore, SortOrder, StoreResult};

/// Insert payload for a line item
#[derive(Debug, Clone, Serialize)]
pub struct NewOrderItem {
    pub order_id: String,
    pub position: u32,
    pub menu_item_id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderItemRepository {
    base: BaseRepository,
}

impl OrderItemRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            base: BaseRepository::new(store, Collection::OrderItems),
        }
    }

    /// Insert all items of one order in a single store write
    pub async fn create_many(&self, items: &[NewOrderItem]) -> StoreResult<Vec<OrderItem>> {
        let records = items
            .iter()
            .map(|item| self.base.encode(item))
            .collect::<StoreResult<Vec<_>>>()?;
        let ids = self
            .base
            .store()
            .insert_many(self.base.collection(), records)
            .await?;

        Ok(ids
            .into_iter()
            .zip(items)
            .map(|(id, item)| OrderItem {
                id,
                order_id: item.order_id.clone(),
                position: item.position,
                menu_item_id: item.menu_item_id.clone(),
                name: item.name.clone(),
                price: item.price,
                quantity: item.quantity,
                notes: item.notes.clone(),
            })
            .collect())
    }

    /// Items of one order in cart order
    pub async fn find_by_order(&self, order_id: &str) -> StoreResult<Vec<OrderItem>> {
        let filter = Filter::new()
            .eq("order_id", order_id)
            .order_by("position", SortOrder::Asc);
        let rows = self.base.store().fetch(self.base.collection(), &filter).await?;
        self.base.decode_all(rows)
    }

    /// Items for several orders, grouped by order id
    pub async fn find_by_orders(
        &self,
        order_ids: &[String],
    ) -> StoreResult<HashMap<String, Vec<OrderItem>>> {
        let mut grouped: HashMap<String, Vec<OrderItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }

        let filter = Filter::new()
            .in_list("order_id", order_ids.iter().map(String::as_str))
            .order_by("position", SortOrder::Asc);
        let rows = self.base.store().fetch(self.base.collection(), &filter).await?;
        for item in self.base.decode_all::<OrderItem>(rows)? {
            grouped.entry(item.order_id.clone()).or_default().push(item);
        }
        Ok(grouped)
    }
}
