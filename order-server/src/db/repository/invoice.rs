//! Invoice Repository
//!
//! Insert-only. The store holds a unique key on `order_id`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::Invoice;

use super::BaseRepository;
use crate::db::{Collection, Filter, RecordStore, StoreResult};

#[derive(Debug, Clone, Serialize)]
pub struct NewInvoice {
    pub order_id: String,
    pub restaurant_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    base: BaseRepository,
}

impl InvoiceRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            base: BaseRepository::new(store, Collection::Invoices),
        }
    }

    pub async fn find_by_order(&self, order_id: &str) -> StoreResult<Option<Invoice>> {
        let filter = Filter::new().eq("order_id", order_id).limit(1);
        let rows = self.base.store().fetch(self.base.collection(), &filter).await?;
        rows.into_iter().next().map(|r| self.base.decode(r)).transpose()
    }

    /// Fails with `StoreError::UniqueViolation` if the order already has one
    pub async fn create(&self, invoice: &NewInvoice) -> StoreResult<Invoice> {
        let record = self.base.encode(invoice)?;
        let id = self
            .base
            .store()
            .insert(self.base.collection(), record)
            .await?;
        Ok(Invoice {
            id,
            order_id: invoice.order_id.clone(),
            restaurant_id: invoice.restaurant_id.clone(),
            subtotal: invoice.subtotal,
            tax: invoice.tax,
            total: invoice.total,
            created_at: invoice.created_at,
        })
    }
}
