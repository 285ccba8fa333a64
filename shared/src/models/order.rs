//! Order Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 订单状态
///
/// `SERVED` 和 `CANCELLED` 为终态。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Created,
    Accepted,
    Cooking,
    Ready,
    Served,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Created,
        OrderStatus::Accepted,
        OrderStatus::Cooking,
        OrderStatus::Ready,
        OrderStatus::Served,
        OrderStatus::Cancelled,
    ];

    /// Transition table: the statuses reachable in one step from `self`.
    ///
    /// Every status check in the system goes through this table.
    pub const fn allowed_next(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Created => &[OrderStatus::Accepted, OrderStatus::Cancelled],
            OrderStatus::Accepted => &[OrderStatus::Cooking, OrderStatus::Cancelled],
            OrderStatus::Cooking => &[OrderStatus::Ready, OrderStatus::Cancelled],
            OrderStatus::Ready => &[OrderStatus::Served, OrderStatus::Cancelled],
            OrderStatus::Served | OrderStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Cooking => "COOKING",
            OrderStatus::Ready => "READY",
            OrderStatus::Served => "SERVED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Order header (`orders`)
///
/// `total_amount` is the price snapshot taken at creation and is never
/// recomputed from live menu prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub restaurant_id: String,
    pub table_number: String,
    /// Staff member who placed the order
    pub waiter_id: String,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Order line item (`order_items`)
///
/// Name and unit price are snapshots; renaming or deleting the menu item
/// afterwards does not affect them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    /// 0-based position in the original cart
    pub position: u32,
    pub menu_item_id: String,
    pub name: String,
    /// Unit price
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Cart entry as sent by staff clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItemInput {
    pub menu_item_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub restaurant_id: String,
    pub table_number: String,
    #[serde(default)]
    pub items: Vec<CartItemInput>,
}

/// Order header together with its line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Single-order view: header fields inline, plus items and the statuses
/// the requesting staff member may move the order to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub allowed_transitions: Vec<OrderStatus>,
}

/// Status change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// Status history entry (`order_status_history`), append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusHistory {
    pub id: String,
    pub order_id: String,
    pub status: OrderStatus,
    /// Staff member who performed the change
    pub changed_by: String,
    pub created_at: DateTime<Utc>,
}
