//! Order API Module

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

/// Order router (authentication required on every route)
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/history", get(handler::history))
}
