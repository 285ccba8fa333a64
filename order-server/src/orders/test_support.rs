//! Store wrappers and fixtures for lifecycle tests

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use shared::models::OrderStatus;

use crate::db::{Collection, Filter, MemoryStore, Record, RecordStore, StoreError, StoreResult};

pub fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

/// Memory store seeded with three menu items: Soup 10.00, Bread 5.50, Tea 2.25
pub fn menu_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.seed(
        Collection::MenuItems,
        vec![
            record(json!({"id": "m1", "name": "Soup", "price": 10.0})),
            record(json!({"id": "m2", "name": "Bread", "price": 5.5})),
            record(json!({"id": "m3", "name": "Tea", "price": 2.25})),
        ],
    );
    Arc::new(store)
}

/// Wraps a [`MemoryStore`] and injects failures or concurrent writers
#[derive(Debug)]
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing_inserts: Mutex<HashSet<Collection>>,
    failing_fetches: Mutex<HashSet<Collection>>,
    failing_deletes: AtomicUsize,
    delete_attempts: AtomicUsize,
    /// Status another writer sets just before the next guarded order update
    racing_status: Mutex<Option<OrderStatus>>,
    /// Insert a competing invoice just before the next invoice insert
    racing_invoice: Mutex<bool>,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failing_inserts: Mutex::new(HashSet::new()),
            failing_fetches: Mutex::new(HashSet::new()),
            failing_deletes: AtomicUsize::new(0),
            delete_attempts: AtomicUsize::new(0),
            racing_status: Mutex::new(None),
            racing_invoice: Mutex::new(false),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail_inserts_into(&self, collection: Collection) {
        self.failing_inserts.lock().insert(collection);
    }

    pub fn heal_inserts_into(&self, collection: Collection) {
        self.failing_inserts.lock().remove(&collection);
    }

    pub fn fail_fetches_from(&self, collection: Collection) {
        self.failing_fetches.lock().insert(collection);
    }

    /// Fail the next `n` deletes
    pub fn fail_next_deletes(&self, n: usize) {
        self.failing_deletes.store(n, Ordering::SeqCst);
    }

    pub fn delete_attempts(&self) -> usize {
        self.delete_attempts.load(Ordering::SeqCst)
    }

    pub fn race_next_status_update(&self, status: OrderStatus) {
        *self.racing_status.lock() = Some(status);
    }

    pub fn race_next_invoice_insert(&self) {
        *self.racing_invoice.lock() = true;
    }

    fn check_insert(&self, collection: Collection) -> StoreResult<()> {
        if self.failing_inserts.lock().contains(&collection) {
            return Err(StoreError::Unavailable(format!("{} offline", collection)));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn fetch_by_id(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>> {
        if self.failing_fetches.lock().contains(&collection) {
            return Err(StoreError::Timeout);
        }
        self.inner.fetch_by_id(collection, id).await
    }

    async fn fetch(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Record>> {
        if self.failing_fetches.lock().contains(&collection) {
            return Err(StoreError::Timeout);
        }
        self.inner.fetch(collection, filter).await
    }

    async fn insert(&self, collection: Collection, record: Record) -> StoreResult<String> {
        self.check_insert(collection)?;
        let race = collection == Collection::Invoices
            && std::mem::replace(&mut *self.racing_invoice.lock(), false);
        if race {
            let mut competitor = record.clone();
            competitor.remove("id");
            self.inner.insert(collection, competitor).await?;
        }
        self.inner.insert(collection, record).await
    }

    async fn insert_many(
        &self,
        collection: Collection,
        records: Vec<Record>,
    ) -> StoreResult<Vec<String>> {
        self.check_insert(collection)?;
        self.inner.insert_many(collection, records).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        changes: Record,
        guard: Option<&Filter>,
    ) -> StoreResult<bool> {
        let racing = if collection == Collection::Orders && guard.is_some() {
            self.racing_status.lock().take()
        } else {
            None
        };
        if let Some(status) = racing {
            let winner = record(json!({"status": status.as_str()}));
            self.inner.update(collection, id, winner, None).await?;
        }
        self.inner.update(collection, id, changes, guard).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        self.delete_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failing_deletes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_deletes.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("delete refused".to_string()));
        }
        self.inner.delete(collection, id).await
    }
}
