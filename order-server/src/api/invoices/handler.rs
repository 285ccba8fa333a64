//! Invoice API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::ErrorCode;
use shared::models::InvoiceDetail;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::security_log;
use crate::utils::{AppError, AppResult};

/// Invoice of an order, with the order and its items
pub async fn get_by_order(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<InvoiceDetail>> {
    if !state.orders().policy().can_read_invoices(user.role) {
        security_log!(
            "WARN",
            "invoice_read_denied",
            user_id = user.id.as_str(),
            role = user.role.as_str()
        );
        return Err(AppError::forbidden(format!(
            "Role {} may not read invoices",
            user.role
        )));
    }

    state
        .orders()
        .invoice_detail(&order_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::new(ErrorCode::InvoiceNotFound).with_detail("order_id", order_id))
}
