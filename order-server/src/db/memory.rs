//! In-process record store
//!
//! Every operation takes the single `RwLock` once, so a guarded update
//! (check + write) is atomic with respect to other requests. Unique keys
//! are enforced on insert, which is what makes invoice creation race-safe.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

use super::{Collection, Filter, Record, RecordStore, SortOrder, StoreError, StoreResult};

#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Collection, Vec<Record>>>,
    unique_keys: HashMap<Collection, Vec<&'static str>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store with the lifecycle unique keys (`invoices.order_id`)
    pub fn new() -> Self {
        let mut unique_keys = HashMap::new();
        unique_keys.insert(Collection::Invoices, vec!["order_id"]);
        Self {
            tables: RwLock::new(HashMap::new()),
            unique_keys,
        }
    }

    /// Insert records verbatim (ids included), bypassing unique checks
    pub fn seed(&self, collection: Collection, records: impl IntoIterator<Item = Record>) {
        let mut tables = self.tables.write();
        let table = tables.entry(collection).or_default();
        for mut record in records {
            ensure_id(&mut record);
            table.push(record);
        }
    }

    /// Load a JSON seed file of the form `{"menu_items": [{...}, ...], ...}`
    pub fn load_seed_file(&self, path: &Path) -> anyhow::Result<usize> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let parsed: HashMap<String, Vec<Record>> =
            serde_json::from_str(&raw).context("seed file is not a map of record arrays")?;

        let mut total = 0;
        for (name, records) in parsed {
            let collection = Collection::from_name(&name)
                .with_context(|| format!("unknown collection in seed file: {}", name))?;
            total += records.len();
            self.seed(collection, records);
        }
        Ok(total)
    }

    /// Number of records in a collection
    pub fn count(&self, collection: Collection) -> usize {
        self.tables
            .read()
            .get(&collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn check_unique(
        &self,
        collection: Collection,
        existing: &[Record],
        incoming: &[Record],
    ) -> StoreResult<()> {
        let mut fields = vec!["id"];
        if let Some(keys) = self.unique_keys.get(&collection) {
            fields.extend(keys.iter().copied());
        }

        for field in fields {
            let mut seen: Vec<&Value> = existing
                .iter()
                .filter_map(|r| r.get(field))
                .filter(|v| !v.is_null())
                .collect();
            for record in incoming {
                let Some(value) = record.get(field).filter(|v| !v.is_null()) else {
                    continue;
                };
                if seen.contains(&value) {
                    return Err(StoreError::UniqueViolation {
                        collection,
                        field: field.to_string(),
                    });
                }
                seen.push(value);
            }
        }
        Ok(())
    }
}

fn ensure_id(record: &mut Record) -> String {
    match record.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            let id = shared::util::new_id();
            record.insert("id".to_string(), Value::String(id.clone()));
            id
        }
    }
}

fn id_of(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Timestamps compare chronologically (their RFC 3339 text does not sort
/// reliably), numbers numerically, everything else as text.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => {
            match (
                x.parse::<DateTime<Utc>>(),
                y.parse::<DateTime<Utc>>(),
            ) {
                (Ok(dx), Ok(dy)) => dx.cmp(&dy),
                _ => x.cmp(y),
            }
        }
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_by_id(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>> {
        let tables = self.tables.read();
        Ok(tables
            .get(&collection)
            .and_then(|t| t.iter().find(|r| id_of(r).as_deref() == Some(id)))
            .cloned())
    }

    async fn fetch(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Record>> {
        let mut rows: Vec<Record> = {
            let tables = self.tables.read();
            tables
                .get(&collection)
                .map(|t| t.iter().filter(|r| filter.matches(r)).cloned().collect())
                .unwrap_or_default()
        };

        if let Some((field, order)) = &filter.order_by {
            // Stable: ties keep insertion order
            rows.sort_by(|a, b| {
                let ord = compare_values(
                    a.get(field).unwrap_or(&Value::Null),
                    b.get(field).unwrap_or(&Value::Null),
                );
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn insert(&self, collection: Collection, record: Record) -> StoreResult<String> {
        let mut ids = self.insert_many(collection, vec![record]).await?;
        ids.pop()
            .ok_or_else(|| StoreError::Rejected("insert produced no record".to_string()))
    }

    async fn insert_many(
        &self,
        collection: Collection,
        mut records: Vec<Record>,
    ) -> StoreResult<Vec<String>> {
        let ids: Vec<String> = records.iter_mut().map(ensure_id).collect();

        let mut tables = self.tables.write();
        let table = tables.entry(collection).or_default();
        self.check_unique(collection, table, &records)?;
        table.extend(records);
        Ok(ids)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        changes: Record,
        guard: Option<&Filter>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let Some(record) = tables
            .get_mut(&collection)
            .and_then(|t| t.iter_mut().find(|r| id_of(r).as_deref() == Some(id)))
        else {
            return Ok(false);
        };

        if let Some(guard) = guard
            && !guard.matches(record)
        {
            return Ok(false);
        }

        for (key, value) in changes {
            if key != "id" {
                record.insert(key, value);
            }
        }
        Ok(true)
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let Some(table) = tables.get_mut(&collection) else {
            return Ok(false);
        };
        let before = table.len();
        table.retain(|r| id_of(r).as_deref() != Some(id));
        Ok(table.len() != before)
    }
}
