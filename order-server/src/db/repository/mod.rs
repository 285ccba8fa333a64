//! Repository Module
//!
//! Typed CRUD over the [`RecordStore`] collections used by the order core.

pub mod invoice;
pub mod menu_item;
pub mod order;
pub mod order_item;
pub mod status_history;

pub use invoice::InvoiceRepository;
pub use menu_item::MenuItemRepository;
pub use order::OrderRepository;
pub use order_item::OrderItemRepository;
pub use status_history::StatusHistoryRepository;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Collection, Record, RecordStore, StoreError, StoreResult};

/// Base repository with store reference
#[derive(Debug, Clone)]
pub struct BaseRepository {
    store: Arc<dyn RecordStore>,
    collection: Collection,
}

impl BaseRepository {
    pub fn new(store: Arc<dyn RecordStore>, collection: Collection) -> Self {
        Self { store, collection }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Serialize a row payload into a store record
    pub fn encode<T: Serialize>(&self, value: &T) -> StoreResult<Record> {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StoreError::Decode {
                collection: self.collection,
                message: format!("expected an object, got {}", other),
            }),
            Err(e) => Err(StoreError::Decode {
                collection: self.collection,
                message: e.to_string(),
            }),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, record: Record) -> StoreResult<T> {
        serde_json::from_value(Value::Object(record)).map_err(|e| StoreError::Decode {
            collection: self.collection,
            message: e.to_string(),
        })
    }

    pub fn decode_all<T: DeserializeOwned>(&self, records: Vec<Record>) -> StoreResult<Vec<T>> {
        records.into_iter().map(|r| self.decode(r)).collect()
    }

    pub async fn find_by_id<T: DeserializeOwned>(&self, id: &str) -> StoreResult<Option<T>> {
        self.store
            .fetch_by_id(self.collection, id)
            .await?
            .map(|r| self.decode(r))
            .transpose()
    }
}
