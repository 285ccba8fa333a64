//! Role Capabilities
//!
//! 声明式能力表：角色 → 可设置的目标状态 + 下单/查询范围/账单权限。
//!
//! | Role | Transition targets | Create | List scope | Invoices |
//! |------|--------------------|--------|------------|----------|
//! | ADMIN | all non-initial | yes | all | yes |
//! | CHEF | ACCEPTED, COOKING, READY, CANCELLED | no | all | no |
//! | WAITER | SERVED, CANCELLED | yes | own | no |
//! | CASHIER | - | no | all | yes |
//!
//! Transition grants can be replaced per role with
//! `ORDER_TRANSITION_GRANTS="WAITER=ACCEPTED|SERVED|CANCELLED;CHEF=READY"`.

use std::collections::{BTreeSet, HashMap};

use shared::models::{OrderStatus, StaffRole};
use thiserror::Error;

/// Which orders a role may list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    All,
    /// Only orders the caller placed
    Own,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCapabilities {
    pub transitions: BTreeSet<OrderStatus>,
    pub create_orders: bool,
    pub list_scope: ListScope,
    pub read_invoices: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrantParseError {
    #[error("malformed grant entry: {0}")]
    Malformed(String),

    #[error(transparent)]
    Role(#[from] shared::models::role::UnknownRole),

    #[error(transparent)]
    Status(#[from] shared::models::order::UnknownStatus),
}

/// Capability table consulted once per request
#[derive(Debug, Clone)]
pub struct CapabilityPolicy {
    roles: HashMap<StaffRole, RoleCapabilities>,
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        use OrderStatus::*;

        let caps = |targets: &[OrderStatus], create, scope, invoices| RoleCapabilities {
            transitions: targets.iter().copied().collect(),
            create_orders: create,
            list_scope: scope,
            read_invoices: invoices,
        };

        let roles = HashMap::from([
            (
                StaffRole::Admin,
                caps(
                    &[Accepted, Cooking, Ready, Served, Cancelled],
                    true,
                    ListScope::All,
                    true,
                ),
            ),
            (
                StaffRole::Chef,
                caps(
                    &[Accepted, Cooking, Ready, Cancelled],
                    false,
                    ListScope::All,
                    false,
                ),
            ),
            (
                StaffRole::Waiter,
                caps(&[Served, Cancelled], true, ListScope::Own, false),
            ),
            (StaffRole::Cashier, caps(&[], false, ListScope::All, true)),
        ]);
        Self { roles }
    }
}

impl CapabilityPolicy {
    /// Default table with `grants` (if any) applied on top
    pub fn with_overrides(grants: Option<&str>) -> Result<Self, GrantParseError> {
        let mut policy = Self::default();
        if let Some(grants) = grants {
            for (role, targets) in parse_grants(grants)? {
                policy.set_transitions(role, targets);
            }
        }
        Ok(policy)
    }

    pub fn set_transitions(&mut self, role: StaffRole, targets: BTreeSet<OrderStatus>) {
        if let Some(caps) = self.roles.get_mut(&role) {
            caps.transitions = targets;
        }
    }

    pub fn can_transition(&self, role: StaffRole, target: OrderStatus) -> bool {
        self.roles
            .get(&role)
            .is_some_and(|c| c.transitions.contains(&target))
    }

    pub fn can_create(&self, role: StaffRole) -> bool {
        self.roles.get(&role).is_some_and(|c| c.create_orders)
    }

    pub fn can_read_invoices(&self, role: StaffRole) -> bool {
        self.roles.get(&role).is_some_and(|c| c.read_invoices)
    }

    pub fn list_scope(&self, role: StaffRole) -> ListScope {
        self.roles
            .get(&role)
            .map(|c| c.list_scope)
            .unwrap_or(ListScope::Own)
    }

    /// Targets reachable from `current` that `role` may set
    pub fn allowed_targets(&self, role: StaffRole, current: OrderStatus) -> Vec<OrderStatus> {
        current
            .allowed_next()
            .iter()
            .copied()
            .filter(|next| self.can_transition(role, *next))
            .collect()
    }
}

/// Parse `ROLE=STATUS|STATUS;ROLE=...`. An empty target list revokes all.
pub fn parse_grants(
    grants: &str,
) -> Result<Vec<(StaffRole, BTreeSet<OrderStatus>)>, GrantParseError> {
    grants
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (role, targets) = entry
                .split_once('=')
                .ok_or_else(|| GrantParseError::Malformed(entry.to_string()))?;
            let role: StaffRole = role.parse()?;
            let targets = targets
                .split('|')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::parse::<OrderStatus>)
                .collect::<Result<BTreeSet<_>, _>>()?;
            Ok((role, targets))
        })
        .collect()
}
