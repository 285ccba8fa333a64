use shared::error::{AppError, ErrorCode, RETRY_LATER_MESSAGE};
use shared::models::{OrderStatus, StaffRole};
use thiserror::Error;

use crate::db::StoreError;

/// Order lifecycle errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Unknown menu items: {}", .0.join(", "))]
    UnknownItem(Vec<String>),

    #[error("Order must contain at least one item")]
    EmptyCart,

    #[error("Invalid quantity {quantity} for menu item {menu_item_id}")]
    InvalidQuantity { menu_item_id: String, quantity: i32 },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Role {role} may not set status {target}")]
    Forbidden { role: StaffRole, target: OrderStatus },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Order header left without line items after compensation failed
    #[error("Order {order_id} is in an inconsistent state")]
    ConsistencyFault { order_id: String },
}

pub type OrderResult<T> = Result<T, OrderError>;

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::UnknownItem(ids) => {
                AppError::with_message(ErrorCode::MenuItemNotFound, "Unknown menu item")
                    .with_detail("menu_item_ids", ids)
            }
            OrderError::EmptyCart => AppError::new(ErrorCode::OrderEmpty),
            OrderError::InvalidQuantity {
                menu_item_id,
                quantity,
            } => AppError::new(ErrorCode::InvalidQuantity)
                .with_detail("menu_item_id", menu_item_id)
                .with_detail("quantity", quantity),
            OrderError::OrderNotFound(id) => {
                AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", id)
            }
            OrderError::InvalidTransition { from, to } => AppError::with_message(
                ErrorCode::InvalidStatusTransition,
                format!("Cannot change status from {} to {}", from, to),
            )
            .with_detail("from", from.as_str())
            .with_detail("to", to.as_str()),
            OrderError::Forbidden { role, target } => AppError::with_message(
                ErrorCode::TransitionForbidden,
                format!("Role {} may not set status {}", role, target),
            )
            .with_detail("role", role.as_str())
            .with_detail("target", target.as_str()),
            OrderError::Store(e) => {
                tracing::error!(error = %e, "Store error occurred");
                AppError::database()
            }
            OrderError::ConsistencyFault { order_id } => {
                AppError::with_message(ErrorCode::ConsistencyFault, RETRY_LATER_MESSAGE)
                    .with_detail("order_id", order_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_validation_errors_are_bad_request() {
        let err: AppError = OrderError::EmptyCart.into();
        assert_eq!(err.code, ErrorCode::OrderEmpty);
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);

        let err: AppError = OrderError::UnknownItem(vec!["m9".into()]).into();
        assert_eq!(err.code, ErrorCode::MenuItemNotFound);
        assert_eq!(
            err.details.unwrap()["menu_item_ids"],
            serde_json::json!(["m9"])
        );
    }

    #[test]
    fn test_transition_errors() {
        let err: AppError = OrderError::InvalidTransition {
            from: OrderStatus::Cooking,
            to: OrderStatus::Served,
        }
        .into();
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.details.as_ref().unwrap()["from"], "COOKING");

        let err: AppError = OrderError::Forbidden {
            role: StaffRole::Cashier,
            target: OrderStatus::Accepted,
        }
        .into();
        assert_eq!(err.code, ErrorCode::TransitionForbidden);
        assert_eq!(err.http_status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_store_error_hides_cause() {
        let err: AppError = OrderError::Store(StoreError::Timeout).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, RETRY_LATER_MESSAGE);
        assert!(err.details.is_none());
    }

    #[test]
    fn test_consistency_fault_is_distinct() {
        let err: AppError = OrderError::ConsistencyFault {
            order_id: "o1".into(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::ConsistencyFault);
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
