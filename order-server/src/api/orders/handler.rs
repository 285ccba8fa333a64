//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use http::StatusCode;
use serde::Deserialize;
use shared::models::{
    CreateOrderRequest, OrderDetail, OrderStatus, OrderStatusHistory, OrderWithItems,
    UpdateStatusRequest,
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::{ListOrdersQuery, TransitionOutcome};
use crate::security_log;
use crate::utils::{AppError, AppResult};

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(default)]
    pub active: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Create an order from a cart (prices are resolved server-side)
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<OrderWithItems>)> {
    if !state.orders().policy().can_create(user.role) {
        security_log!(
            "WARN",
            "create_order_denied",
            user_id = user.id.as_str(),
            role = user.role.as_str()
        );
        return Err(AppError::forbidden(format!(
            "Role {} may not create orders",
            user.role
        )));
    }

    let created = state.orders().create_order(payload, &user.actor()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List orders, newest first (waiters only see their own)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<OrderWithItems>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let orders = state
        .orders()
        .list_orders(
            ListOrdersQuery {
                status,
                active_only: query.active,
                limit: query.limit,
                offset: query.offset,
            },
            &user.actor(),
        )
        .await?;
    Ok(Json(orders))
}

/// Get order by id, with the transitions the caller may perform
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<OrderDetail>> {
    let detail = state.orders().get_order(&id, &user.actor()).await?;
    Ok(Json(detail))
}

/// Move an order to a new status
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<TransitionOutcome>> {
    let outcome = state
        .orders()
        .transition(&id, payload.status, &user.actor())
        .await?;
    Ok(Json(outcome))
}

/// Status timeline, oldest first
pub async fn history(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<OrderStatusHistory>>> {
    let entries = state.orders().history(&id).await?;
    Ok(Json(entries))
}
