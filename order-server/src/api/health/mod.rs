//! 健康检查路由 - 公共路由 (无需认证)

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::db::{Collection, Filter};

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` when the record store answered, `degraded` otherwise
    status: &'static str,
    version: &'static str,
    store: StoreHealth,
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    backend: &'static str,
    reachable: bool,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let probe = state
        .store
        .fetch(Collection::MenuItems, &Filter::new().limit(1))
        .await;
    if let Err(e) = &probe {
        tracing::warn!(error = %e, "Health check: record store unreachable");
    }

    let reachable = probe.is_ok();
    Json(HealthResponse {
        status: if reachable { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        store: StoreHealth {
            backend: state.config.store.backend.as_str(),
            reachable,
        },
    })
}
