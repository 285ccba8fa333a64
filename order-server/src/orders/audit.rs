//! Audit Logger
//!
//! One history row per status change, creation included. Recording is
//! best-effort: a failed append is logged and never fails the caller.

use std::sync::Arc;

use shared::models::{OrderStatus, OrderStatusHistory};

use super::Actor;
use crate::db::repository::StatusHistoryRepository;
use crate::db::repository::status_history::NewStatusHistory;
use crate::db::{RecordStore, StoreResult};

#[derive(Debug, Clone)]
pub struct AuditLogger {
    history: StatusHistoryRepository,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            history: StatusHistoryRepository::new(store),
        }
    }

    /// Append an entry; returns `None` if the store refused it
    pub async fn record(
        &self,
        order_id: &str,
        status: OrderStatus,
        actor: &Actor,
    ) -> Option<OrderStatusHistory> {
        let entry = NewStatusHistory {
            order_id: order_id.to_string(),
            status,
            changed_by: actor.id.clone(),
            created_at: shared::util::now(),
        };
        match self.history.append(&entry).await {
            Ok(saved) => Some(saved),
            Err(e) => {
                tracing::warn!(
                    order_id = %order_id,
                    status = %status,
                    changed_by = %actor.id,
                    error = %e,
                    "Failed to record status history"
                );
                None
            }
        }
    }

    /// Oldest first
    pub async fn history(&self, order_id: &str) -> StoreResult<Vec<OrderStatusHistory>> {
        self.history.find_by_order(order_id).await
    }
}
