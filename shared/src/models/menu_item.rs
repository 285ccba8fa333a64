//! Menu Item Model (read-only for the order core)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 菜品 (`menu_items`)
///
/// Only `id`, `name` and `price` matter when pricing a cart; the other
/// columns are carried for completeness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
