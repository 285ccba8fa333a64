//! Order Builder
//!
//! Turns a cart plus resolved prices into an immutable snapshot. Pure: no
//! store access, so retrying it is always safe.

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::models::CartItemInput;

use super::error::{OrderError, OrderResult};
use super::money::{MAX_QUANTITY, line_total};
use crate::pricing::ResolvedPrice;

/// Header fields not derived from the cart
#[derive(Debug, Clone)]
pub struct OrderHeader {
    pub restaurant_id: String,
    pub table_number: String,
    pub waiter_id: String,
}

/// Line item snapshot, in cart order
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemDraft {
    pub position: u32,
    pub menu_item_id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub notes: Option<String>,
}

/// A fully priced order that has not been persisted yet
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub restaurant_id: String,
    pub table_number: String,
    pub waiter_id: String,
    pub items: Vec<LineItemDraft>,
    pub total_amount: Decimal,
}

/// Reject empty carts and out-of-range quantities
pub fn validate_cart(cart: &[CartItemInput]) -> OrderResult<()> {
    if cart.is_empty() {
        return Err(OrderError::EmptyCart);
    }
    for entry in cart {
        if entry.quantity < 1 || entry.quantity > MAX_QUANTITY {
            return Err(OrderError::InvalidQuantity {
                menu_item_id: entry.menu_item_id.clone(),
                quantity: entry.quantity,
            });
        }
    }
    Ok(())
}

/// Build the order snapshot.
///
/// Every cart entry must have a price in `prices`; an entry without one is
/// reported as `UnknownItem`.
pub fn build_order(
    header: OrderHeader,
    cart: &[CartItemInput],
    prices: &HashMap<String, ResolvedPrice>,
) -> OrderResult<OrderDraft> {
    validate_cart(cart)?;

    let mut missing: Vec<String> = cart
        .iter()
        .filter(|entry| !prices.contains_key(&entry.menu_item_id))
        .map(|entry| entry.menu_item_id.clone())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Err(OrderError::UnknownItem(missing));
    }

    let mut items = Vec::with_capacity(cart.len());
    let mut total_amount = Decimal::ZERO;
    for (position, entry) in cart.iter().enumerate() {
        let Some(resolved) = prices.get(&entry.menu_item_id) else {
            continue;
        };
        total_amount += line_total(resolved.price, entry.quantity);
        items.push(LineItemDraft {
            position: position as u32,
            menu_item_id: entry.menu_item_id.clone(),
            name: resolved.name.clone(),
            price: resolved.price,
            quantity: entry.quantity,
            notes: entry.notes.clone().filter(|n| !n.trim().is_empty()),
        });
    }

    Ok(OrderDraft {
        restaurant_id: header.restaurant_id,
        table_number: header.table_number,
        waiter_id: header.waiter_id,
        items,
        total_amount,
    })
}
