//! Invoice Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::{Order, OrderItem};

/// 账单 (`invoices`)
///
/// At most one per order (unique on `order_id`), created when the order
/// first reaches `SERVED` and never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub order_id: String,
    pub restaurant_id: String,
    /// Copied from the order's frozen total
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    /// `subtotal + tax`
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Invoice with the order it bills
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub order: Order,
    pub items: Vec<OrderItem>,
}
