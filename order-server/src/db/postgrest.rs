//! PostgREST record store (Supabase-compatible)
//!
//! | Operation | Request |
//! |-----------|---------|
//! | fetch_by_id | `GET /rest/v1/{table}?id=eq.{id}` |
//! | fetch | `GET /rest/v1/{table}?{col}=eq.{v}&order=...&limit=...` |
//! | insert / insert_many | `POST /rest/v1/{table}` |
//! | update | `PATCH /rest/v1/{table}?id=eq.{id}[&guard...]` |
//! | delete | `DELETE /rest/v1/{table}?id=eq.{id}` |
//!
//! Every mutating request asks for `Prefer: return=representation`, so an
//! empty response body means "no row matched" (used for the status
//! compare-and-swap). Uniqueness is enforced by the database
//! (`migrations/0001_order_lifecycle.sql`); PostgreSQL error `23505`
//! surfaces as [`StoreError::UniqueViolation`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use super::{
    Collection, Condition, Filter, Record, RecordStore, SortOrder, StoreError, StoreResult,
};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        })
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.name())
    }

    fn request(&self, method: Method, collection: Collection) -> RequestBuilder {
        self.client
            .request(method, self.table_url(collection))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, collection: Collection, request: RequestBuilder) -> StoreResult<Vec<Record>> {
        let response = request.send().await.map_err(map_transport_error)?;
        read_rows(collection, response).await
    }
}

fn map_transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Unavailable(err.to_string())
    }
}

async fn read_rows(collection: Collection, response: Response) -> StoreResult<Vec<Record>> {
    let status = response.status();
    let body = response.text().await.map_err(map_transport_error)?;

    if !status.is_success() {
        return Err(classify_failure(collection, status, &body));
    }

    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&body).map_err(|e| StoreError::Decode {
        collection,
        message: e.to_string(),
    })
}

/// Only PostgreSQL `23505` is a uniqueness conflict. Other 409s (foreign
/// keys, exclusion constraints) are plain rejections.
fn classify_failure(collection: Collection, status: StatusCode, body: &str) -> StoreError {
    let error_code = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("code").and_then(Value::as_str).map(str::to_string));
    if error_code.as_deref() == Some(UNIQUE_VIOLATION) {
        return StoreError::UniqueViolation {
            collection,
            field: unique_field(collection).to_string(),
        };
    }
    StoreError::Rejected(format!("{} {}: {}", collection, status, body))
}

fn unique_field(collection: Collection) -> &'static str {
    match collection {
        Collection::Invoices => "order_id",
        _ => "id",
    }
}

/// Render a JSON value the way PostgREST expects inside a filter operand
fn operand(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Render a list operand: `("a","b")`, quoting strings
fn list_operand(values: &[Value]) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|v| match v {
            Value::String(s) => format!("\"{}\"", s.replace('"', "\\\"")),
            other => operand(other),
        })
        .collect();
    format!("({})", items.join(","))
}

/// Query-string pairs for a filter
pub(crate) fn filter_params(filter: &Filter) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = filter
        .conditions
        .iter()
        .map(|condition| match condition {
            Condition::Eq(field, Value::Null) => (field.clone(), "is.null".to_string()),
            Condition::Eq(field, value) => (field.clone(), format!("eq.{}", operand(value))),
            Condition::In(field, values) => (field.clone(), format!("in.{}", list_operand(values))),
            Condition::NotIn(field, values) => {
                (field.clone(), format!("not.in.{}", list_operand(values)))
            }
        })
        .collect();

    if let Some((field, order)) = &filter.order_by {
        let direction = match order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        params.push(("order".to_string(), format!("{}.{}", field, direction)));
    }
    if let Some(limit) = filter.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = filter.offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    params
}

fn id_param(id: &str) -> (String, String) {
    ("id".to_string(), format!("eq.{}", id))
}

fn row_id(collection: Collection, row: &Record) -> StoreResult<String> {
    match row.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(StoreError::Decode {
            collection,
            message: "returned row has no id".to_string(),
        }),
    }
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn fetch_by_id(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>> {
        let request = self
            .request(Method::GET, collection)
            .query(&[id_param(id), ("select".to_string(), "*".to_string())]);
        let mut rows = self.send(collection, request).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn fetch(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Record>> {
        let mut params = filter_params(filter);
        params.push(("select".to_string(), "*".to_string()));
        let request = self.request(Method::GET, collection).query(&params);
        self.send(collection, request).await
    }

    async fn insert(&self, collection: Collection, record: Record) -> StoreResult<String> {
        let mut ids = self.insert_many(collection, vec![record]).await?;
        ids.pop()
            .ok_or_else(|| StoreError::Rejected(format!("{}: insert returned no row", collection)))
    }

    async fn insert_many(
        &self,
        collection: Collection,
        records: Vec<Record>,
    ) -> StoreResult<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let expected = records.len();
        let request = self
            .request(Method::POST, collection)
            .header("Prefer", "return=representation")
            .json(&records);
        let rows = self.send(collection, request).await?;
        if rows.len() != expected {
            return Err(StoreError::Rejected(format!(
                "{}: inserted {} of {} rows",
                collection,
                rows.len(),
                expected
            )));
        }
        rows.iter().map(|row| row_id(collection, row)).collect()
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        changes: Record,
        guard: Option<&Filter>,
    ) -> StoreResult<bool> {
        let mut params = vec![id_param(id)];
        if let Some(guard) = guard {
            params.extend(filter_params(guard));
        }
        let request = self
            .request(Method::PATCH, collection)
            .header("Prefer", "return=representation")
            .query(&params)
            .json(&changes);
        let rows = self.send(collection, request).await?;
        Ok(!rows.is_empty())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        let request = self
            .request(Method::DELETE, collection)
            .header("Prefer", "return=representation")
            .query(&[id_param(id)]);
        let rows = self.send(collection, request).await?;
        Ok(!rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_params() {
        let filter = Filter::new()
            .eq("waiter_id", "w1")
            .not_in("status", ["SERVED", "CANCELLED"])
            .order_by("created_at", SortOrder::Desc)
            .limit(20)
            .offset(40);

        let params = filter_params(&filter);
        assert_eq!(
            params,
            vec![
                ("waiter_id".to_string(), "eq.w1".to_string()),
                (
                    "status".to_string(),
                    "not.in.(\"SERVED\",\"CANCELLED\")".to_string()
                ),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "20".to_string()),
                ("offset".to_string(), "40".to_string()),
            ]
        );
    }

    #[test]
    fn test_in_list_and_null() {
        let filter = Filter::new()
            .in_list("id", ["a", "b"])
            .eq("notes", Value::Null)
            .eq("position", 3);
        let params = filter_params(&filter);
        assert_eq!(params[0].1, "in.(\"a\",\"b\")");
        assert_eq!(params[1].1, "is.null");
        assert_eq!(params[2].1, "eq.3");
    }

    #[test]
    fn test_only_unique_code_is_unique_violation() {
        let unique = classify_failure(
            Collection::Invoices,
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value"}"#,
        );
        assert!(matches!(
            unique,
            StoreError::UniqueViolation { collection: Collection::Invoices, ref field } if field == "order_id"
        ));

        let foreign_key = classify_failure(
            Collection::OrderItems,
            StatusCode::CONFLICT,
            r#"{"code":"23503","message":"violates foreign key constraint"}"#,
        );
        assert!(matches!(foreign_key, StoreError::Rejected(ref msg) if msg.contains("23503")));

        let bare = classify_failure(Collection::Orders, StatusCode::CONFLICT, "");
        assert!(matches!(bare, StoreError::Rejected(_)));
    }

    #[test]
    fn test_table_url_trims_slash() {
        let store =
            PostgrestStore::new("https://db.example.com/ ", "key", Duration::from_secs(1)).unwrap();
        assert_eq!(
            store.table_url(Collection::OrderStatusHistory),
            "https://db.example.com/rest/v1/order_status_history"
        );
    }
}
