//! Invoice API Module

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/invoices/{order_id}", get(handler::get_by_order))
}
