//! 订单生命周期
//!
//! - [`builder`] - cart → priced snapshot (pure)
//! - [`gateway`] - two-phase persistence with compensation
//! - [`state_machine`] - status transitions (table + role + CAS)
//! - [`billing`] - invoice on first `SERVED`
//! - [`audit`] - status history
//! - [`service`] - facade used by the HTTP layer

pub mod audit;
pub mod billing;
pub mod builder;
pub mod error;
pub mod gateway;
pub mod money;
pub mod service;
pub mod state_machine;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{OrderError, OrderResult};
pub use service::{ListOrdersQuery, OrderService};
pub use state_machine::TransitionOutcome;

use shared::models::StaffRole;

/// Staff member performing an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: StaffRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: StaffRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}
