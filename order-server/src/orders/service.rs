//! Order Service
//!
//! Entry point used by the HTTP handlers. Wires the resolver, builder,
//! gateway, engine and billing trigger over one record store.

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::models::{
    CreateOrderRequest, InvoiceDetail, Order, OrderDetail, OrderItem, OrderStatus,
    OrderStatusHistory, OrderWithItems,
};

use super::Actor;
use super::audit::AuditLogger;
use super::billing::BillingTrigger;
use super::builder::{OrderHeader, build_order, validate_cart};
use super::error::{OrderError, OrderResult};
use super::gateway::OrderGateway;
use super::state_machine::{StatusEngine, TransitionOutcome};
use crate::auth::permissions::{CapabilityPolicy, ListScope};
use crate::db::RecordStore;
use crate::db::repository::order::OrderQuery;
use crate::db::repository::{OrderItemRepository, OrderRepository};
use crate::pricing::PricingResolver;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

/// List filters accepted from clients
#[derive(Debug, Clone, Default)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    pub active_only: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct OrderService {
    pricing: PricingResolver,
    gateway: OrderGateway,
    engine: StatusEngine,
    billing: BillingTrigger,
    audit: AuditLogger,
    orders: OrderRepository,
    items: OrderItemRepository,
    policy: Arc<CapabilityPolicy>,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        policy: Arc<CapabilityPolicy>,
        tax_rate: Decimal,
    ) -> Self {
        let audit = AuditLogger::new(store.clone());
        let billing = BillingTrigger::new(store.clone(), tax_rate);
        Self {
            pricing: PricingResolver::new(store.clone()),
            gateway: OrderGateway::new(store.clone(), audit.clone()),
            engine: StatusEngine::new(
                store.clone(),
                audit.clone(),
                billing.clone(),
                policy.clone(),
            ),
            billing,
            audit,
            orders: OrderRepository::new(store.clone()),
            items: OrderItemRepository::new(store),
            policy,
        }
    }

    pub fn policy(&self) -> &CapabilityPolicy {
        &self.policy
    }

    /// Price the cart server-side and persist it as a `CREATED` order
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        actor: &Actor,
    ) -> OrderResult<OrderWithItems> {
        // Shape errors never reach the store
        validate_cart(&request.items)?;

        let ids: Vec<&str> = request
            .items
            .iter()
            .map(|item| item.menu_item_id.as_str())
            .collect();
        let prices = self.pricing.resolve(&ids).await?;

        let header = OrderHeader {
            restaurant_id: request.restaurant_id,
            table_number: request.table_number,
            waiter_id: actor.id.clone(),
        };
        let draft = build_order(header, &request.items, &prices)?;
        let (order, items) = self.gateway.persist(draft, actor).await?;
        Ok(OrderWithItems { order, items })
    }

    /// Newest first, scoped by the caller's role
    pub async fn list_orders(
        &self,
        query: ListOrdersQuery,
        actor: &Actor,
    ) -> OrderResult<Vec<OrderWithItems>> {
        let waiter_id = match self.policy.list_scope(actor.role) {
            ListScope::All => None,
            ListScope::Own => Some(actor.id.clone()),
        };
        let store_query = OrderQuery {
            waiter_id,
            status: query.status,
            active_only: query.active_only,
            limit: Some(query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)),
            offset: query.offset,
        };

        let orders = self.orders.find_all(&store_query).await?;
        let ids: Vec<String> = orders.iter().map(|o| o.id.clone()).collect();
        let mut grouped = self.items.find_by_orders(&ids).await?;

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = grouped.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }

    /// Order with items and the moves the caller could make next
    pub async fn get_order(&self, order_id: &str, actor: &Actor) -> OrderResult<OrderDetail> {
        let (order, items) = futures::try_join!(self.load(order_id), self.load_items(order_id))?;
        let allowed_transitions = self.policy.allowed_targets(actor.role, order.status);
        Ok(OrderDetail {
            order,
            items,
            allowed_transitions,
        })
    }

    pub async fn transition(
        &self,
        order_id: &str,
        requested: OrderStatus,
        actor: &Actor,
    ) -> OrderResult<TransitionOutcome> {
        self.engine.transition(order_id, requested, actor).await
    }

    /// Status timeline, oldest first
    pub async fn history(&self, order_id: &str) -> OrderResult<Vec<OrderStatusHistory>> {
        let (_, history) = futures::try_join!(self.load(order_id), async {
            self.audit.history(order_id).await.map_err(OrderError::from)
        })?;
        Ok(history)
    }

    /// Invoice for an order, with the order it bills.
    ///
    /// A `SERVED` order whose invoice write failed earlier gets it created
    /// here. `None` means the order has not been served.
    pub async fn invoice_detail(&self, order_id: &str) -> OrderResult<Option<InvoiceDetail>> {
        let (order, items, existing) = futures::try_join!(
            self.load(order_id),
            self.load_items(order_id),
            self.billing.find(order_id)
        )?;

        let invoice = match existing {
            Some(invoice) => invoice,
            None if order.status == OrderStatus::Served => {
                tracing::warn!(order_id = %order_id, "Served order has no invoice, creating it");
                self.billing.on_served(&order).await?
            }
            None => return Ok(None),
        };

        Ok(Some(InvoiceDetail {
            invoice,
            order,
            items,
        }))
    }

    async fn load(&self, order_id: &str) -> OrderResult<Order> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    async fn load_items(&self, order_id: &str) -> OrderResult<Vec<OrderItem>> {
        Ok(self.items.find_by_order(order_id).await?)
    }
}
