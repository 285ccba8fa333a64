//! Status Transition Engine
//!
//! Validates and applies status changes. The table in
//! [`OrderStatus::allowed_next`] decides which moves exist, the
//! [`CapabilityPolicy`] decides who may make them, and a compare-and-swap
//! update on the current status decides concurrent races.
//!
//! ```text
//! load ─► table check ─► role check ─► CAS write ─► audit ─► billing (SERVED)
//!  404       400             403        400 on loss   best-effort  logged on failure
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::models::{Invoice, Order, OrderStatus};

use super::Actor;
use super::audit::AuditLogger;
use super::billing::BillingTrigger;
use super::error::{OrderError, OrderResult};
use crate::auth::permissions::CapabilityPolicy;
use crate::db::RecordStore;
use crate::db::repository::OrderRepository;

/// Result of a committed transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub order_id: String,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    /// Present when the transition reached `SERVED` and billing succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<Invoice>,
}

#[derive(Debug, Clone)]
pub struct StatusEngine {
    orders: OrderRepository,
    audit: AuditLogger,
    billing: BillingTrigger,
    policy: Arc<CapabilityPolicy>,
}

impl StatusEngine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        audit: AuditLogger,
        billing: BillingTrigger,
        policy: Arc<CapabilityPolicy>,
    ) -> Self {
        Self {
            orders: OrderRepository::new(store),
            audit,
            billing,
            policy,
        }
    }

    /// Check a move against the table and the caller's role
    pub fn authorize(
        &self,
        current: OrderStatus,
        requested: OrderStatus,
        actor: &Actor,
    ) -> OrderResult<()> {
        if !current.can_transition_to(requested) {
            return Err(OrderError::InvalidTransition {
                from: current,
                to: requested,
            });
        }
        if !self.policy.can_transition(actor.role, requested) {
            return Err(OrderError::Forbidden {
                role: actor.role,
                target: requested,
            });
        }
        Ok(())
    }

    pub async fn transition(
        &self,
        order_id: &str,
        requested: OrderStatus,
        actor: &Actor,
    ) -> OrderResult<TransitionOutcome> {
        let order = self.load(order_id).await?;
        let current = order.status;

        if let Err(e) = self.authorize(current, requested, actor) {
            if matches!(e, OrderError::Forbidden { .. }) {
                crate::security_log!(
                    "WARN",
                    "transition_forbidden",
                    user_id = actor.id.as_str(),
                    role = actor.role.as_str(),
                    order_id = order_id,
                    target = requested.as_str()
                );
            }
            return Err(e);
        }

        let swapped = self
            .orders
            .update_status_if(order_id, current, requested)
            .await?;
        if !swapped {
            // Lost a race: report against whatever the winner left behind
            let actual = self.load(order_id).await?;
            tracing::info!(
                order_id = %order_id,
                expected = %current,
                actual = %actual.status,
                requested = %requested,
                "Concurrent status change detected"
            );
            return Err(OrderError::InvalidTransition {
                from: actual.status,
                to: requested,
            });
        }

        tracing::info!(
            order_id = %order_id,
            from = %current,
            to = %requested,
            changed_by = %actor.id,
            "Order status changed"
        );

        self.audit.record(order_id, requested, actor).await;

        let invoice = if requested == OrderStatus::Served {
            let served = Order {
                status: requested,
                ..order
            };
            match self.billing.on_served(&served).await {
                Ok(invoice) => Some(invoice),
                Err(e) => {
                    tracing::error!(
                        order_id = %order_id,
                        error = %e,
                        "Invoice creation failed after SERVED, will be derived on next read"
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(TransitionOutcome {
            order_id: order_id.to_string(),
            previous_status: current,
            new_status: requested,
            invoice,
        })
    }

    async fn load(&self, order_id: &str) -> OrderResult<Order> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Collection, MemoryStore};
    use crate::orders::money::money_eq;
    use crate::orders::test_support::{FlakyStore, record};
    use rust_decimal::Decimal;
    use serde_json::json;
    use shared::models::StaffRole;

    fn seeded(status: OrderStatus) -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.seed(
            Collection::Orders,
            vec![record(json!({
                "id": "o1",
                "restaurant_id": "r1",
                "table_number": "3",
                "waiter_id": "w1",
                "status": status.as_str(),
                "total_amount": 25.5,
                "created_at": "2026-01-05T12:00:00Z"
            }))],
        );
        Arc::new(store)
    }

    fn engine(store: Arc<dyn RecordStore>) -> StatusEngine {
        let audit = AuditLogger::new(store.clone());
        let billing = BillingTrigger::new(store.clone(), Decimal::new(10, 2));
        StatusEngine::new(store, audit, billing, Arc::new(CapabilityPolicy::default()))
    }

    fn admin() -> Actor {
        Actor::new("admin-1", StaffRole::Admin)
    }

    async fn status_of(store: &MemoryStore, id: &str) -> OrderStatus {
        let row = store
            .fetch_by_id(Collection::Orders, id)
            .await
            .unwrap()
            .unwrap();
        row["status"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_happy_path_to_served_bills_once() {
        let store = seeded(OrderStatus::Created);
        let engine = engine(store.clone());

        for next in [
            OrderStatus::Accepted,
            OrderStatus::Cooking,
            OrderStatus::Ready,
        ] {
            let outcome = engine.transition("o1", next, &admin()).await.unwrap();
            assert_eq!(outcome.new_status, next);
            assert!(outcome.invoice.is_none());
        }

        let outcome = engine
            .transition("o1", OrderStatus::Served, &admin())
            .await
            .unwrap();
        assert_eq!(outcome.previous_status, OrderStatus::Ready);
        let invoice = outcome.invoice.unwrap();
        assert!(money_eq(invoice.tax, Decimal::new(255, 2)));
        assert!(money_eq(invoice.total, Decimal::new(2805, 2)));

        assert_eq!(store.count(Collection::Invoices), 1);
        assert_eq!(store.count(Collection::OrderStatusHistory), 4);
        assert_eq!(status_of(&store, "o1").await, OrderStatus::Served);
    }

    #[tokio::test]
    async fn test_skipping_states_is_invalid() {
        let store = seeded(OrderStatus::Cooking);
        let err = engine(store.clone())
            .transition("o1", OrderStatus::Served, &admin())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Cooking,
                to: OrderStatus::Served
            }
        ));
        assert_eq!(status_of(&store, "o1").await, OrderStatus::Cooking);
        assert_eq!(store.count(Collection::OrderStatusHistory), 0);
        assert_eq!(store.count(Collection::Invoices), 0);
    }

    #[tokio::test]
    async fn test_terminal_states_are_final() {
        for terminal in [OrderStatus::Served, OrderStatus::Cancelled] {
            let store = seeded(terminal);
            let engine = engine(store.clone());
            for requested in OrderStatus::ALL {
                let err = engine.transition("o1", requested, &admin()).await.unwrap_err();
                assert!(
                    matches!(err, OrderError::InvalidTransition { from, .. } if from == terminal)
                );
            }
            assert_eq!(status_of(&store, "o1").await, terminal);
        }
    }

    #[tokio::test]
    async fn test_self_loop_is_invalid() {
        let store = seeded(OrderStatus::Ready);
        let err = engine(store)
            .transition("o1", OrderStatus::Ready, &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_role_not_permitted() {
        let store = seeded(OrderStatus::Ready);
        let engine = engine(store.clone());

        let chef = Actor::new("chef-1", StaffRole::Chef);
        let err = engine
            .transition("o1", OrderStatus::Served, &chef)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Forbidden {
                role: StaffRole::Chef,
                target: OrderStatus::Served
            }
        ));

        let cashier = Actor::new("cash-1", StaffRole::Cashier);
        let err = engine
            .transition("o1", OrderStatus::Cancelled, &cashier)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Forbidden { .. }));
        assert_eq!(status_of(&store, "o1").await, OrderStatus::Ready);
    }

    #[tokio::test]
    async fn test_missing_order() {
        let store = Arc::new(MemoryStore::new());
        let err = engine(store)
            .transition("nope", OrderStatus::Accepted, &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_lost_race_reports_actual_status() {
        let flaky = Arc::new(FlakyStore::new(seeded(OrderStatus::Created)));
        flaky.race_next_status_update(OrderStatus::Cancelled);
        let engine = engine(flaky.clone());

        let err = engine
            .transition("o1", OrderStatus::Accepted, &admin())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Accepted
            }
        ));
        assert_eq!(status_of(flaky.inner(), "o1").await, OrderStatus::Cancelled);
        assert_eq!(flaky.inner().count(Collection::OrderStatusHistory), 0);
    }

    #[tokio::test]
    async fn test_billing_failure_keeps_transition() {
        let flaky = Arc::new(FlakyStore::new(seeded(OrderStatus::Ready)));
        flaky.fail_inserts_into(Collection::Invoices);
        let engine = engine(flaky.clone());

        let outcome = engine
            .transition("o1", OrderStatus::Served, &admin())
            .await
            .unwrap();
        assert_eq!(outcome.new_status, OrderStatus::Served);
        assert!(outcome.invoice.is_none());
        assert_eq!(status_of(flaky.inner(), "o1").await, OrderStatus::Served);
        assert_eq!(flaky.inner().count(Collection::Invoices), 0);
    }

    #[tokio::test]
    async fn test_audit_failure_keeps_transition() {
        let flaky = Arc::new(FlakyStore::new(seeded(OrderStatus::Created)));
        flaky.fail_inserts_into(Collection::OrderStatusHistory);

        let outcome = engine(flaky.clone())
            .transition("o1", OrderStatus::Accepted, &admin())
            .await
            .unwrap();
        assert_eq!(outcome.new_status, OrderStatus::Accepted);
        assert_eq!(status_of(flaky.inner(), "o1").await, OrderStatus::Accepted);
    }
}
