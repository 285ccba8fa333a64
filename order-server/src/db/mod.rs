//! 数据存储层
//!
//! The order core talks to a remote, fallible, non-transactional record
//! store through [`RecordStore`]. Two backends are provided:
//!
//! - [`MemoryStore`] - in-process store (development, tests)
//! - [`PostgrestStore`] - PostgREST / Supabase over HTTP
//!
//! Typed access per collection lives in [`repository`].

pub mod memory;
pub mod postgrest;
pub mod repository;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// A single row: column name → JSON value
pub type Record = Map<String, Value>;

/// Named record collections used by the order core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Orders,
    OrderItems,
    OrderStatusHistory,
    Invoices,
    MenuItems,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Orders,
        Collection::OrderItems,
        Collection::OrderStatusHistory,
        Collection::Invoices,
        Collection::MenuItems,
    ];

    /// Table name in the backing store
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Orders => "orders",
            Collection::OrderItems => "order_items",
            Collection::OrderStatusHistory => "order_status_history",
            Collection::Invoices => "invoices",
            Collection::MenuItems => "menu_items",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Record store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store request timed out")]
    Timeout,

    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("unique constraint violated on {collection}.{field}")]
    UniqueViolation {
        collection: Collection,
        field: String,
    },

    #[error("failed to decode {collection} record: {message}")]
    Decode {
        collection: Collection,
        message: String,
    },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A single filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    In(String, Vec<Value>),
    NotIn(String, Vec<Value>),
}

impl Condition {
    pub fn field(&self) -> &str {
        match self {
            Condition::Eq(f, _) | Condition::In(f, _) | Condition::NotIn(f, _) => f,
        }
    }

    /// Evaluate against a record. Missing fields compare as JSON null.
    pub fn matches(&self, record: &Record) -> bool {
        let value = record.get(self.field()).unwrap_or(&Value::Null);
        match self {
            Condition::Eq(_, expected) => value == expected,
            Condition::In(_, options) => options.contains(value),
            Condition::NotIn(_, options) => !options.contains(value),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Fetch-by-filter query: conjunction of conditions plus ordering/paging
///
/// ```ignore
/// let filter = Filter::new()
///     .eq("order_id", "o-1")
///     .order_by("created_at", SortOrder::Asc);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.into(), value.into()));
        self
    }

    pub fn in_list<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push(Condition::In(field.into(), values));
        self
    }

    pub fn not_in<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push(Condition::NotIn(field.into(), values));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

/// Generic record store
///
/// No operation spans more than one statement atomically; callers that
/// need multi-record consistency must compensate themselves. `update` takes
/// an optional guard so read-modify-write sequences can be made
/// compare-and-swap.
#[async_trait]
pub trait RecordStore: Send + Sync + fmt::Debug {
    async fn fetch_by_id(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>>;

    async fn fetch(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Record>>;

    /// Insert one record, returning its id
    async fn insert(&self, collection: Collection, record: Record) -> StoreResult<String>;

    /// Insert several records in a single write, returning their ids in order
    async fn insert_many(
        &self,
        collection: Collection,
        records: Vec<Record>,
    ) -> StoreResult<Vec<String>>;

    /// Apply `changes` to the record with `id` if it also matches `guard`.
    ///
    /// Returns `false` when no record matched.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        changes: Record,
        guard: Option<&Filter>,
    ) -> StoreResult<bool>;

    /// Returns `false` when no record had `id`
    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool>;
}
