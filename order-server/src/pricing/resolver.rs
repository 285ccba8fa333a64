//! Pricing Resolver
//!
//! Looks up the current name and unit price of every menu item referenced
//! by a cart. Clients never supply prices.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::db::RecordStore;
use crate::db::repository::MenuItemRepository;
use crate::orders::OrderError;

/// Current name and unit price of a menu item
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrice {
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone)]
pub struct PricingResolver {
    menu_items: MenuItemRepository,
}

impl PricingResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            menu_items: MenuItemRepository::new(store),
        }
    }

    /// Resolve every id, or reject the whole request.
    ///
    /// Duplicates are fetched once. Missing ids are reported sorted.
    pub async fn resolve(
        &self,
        menu_item_ids: &[&str],
    ) -> Result<HashMap<String, ResolvedPrice>, OrderError> {
        let wanted: BTreeSet<&str> = menu_item_ids.iter().copied().collect();
        let ids: Vec<&str> = wanted.iter().copied().collect();

        let found: HashMap<String, ResolvedPrice> = self
            .menu_items
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .filter(|item| wanted.contains(item.id.as_str()))
            .map(|item| {
                (
                    item.id,
                    ResolvedPrice {
                        name: item.name,
                        price: item.price,
                    },
                )
            })
            .collect();

        let missing: Vec<String> = wanted
            .into_iter()
            .filter(|id| !found.contains_key(*id))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            tracing::debug!(missing = ?missing, "Cart references unknown menu items");
            return Err(OrderError::UnknownItem(missing));
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::test_support::menu_store as store;

    #[tokio::test]
    async fn test_resolve_dedupes_ids() {
        let resolver = PricingResolver::new(store());
        let prices = resolver.resolve(&["m1", "m2", "m1"]).await.unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices["m1"].name, "Soup");
        assert_eq!(prices["m2"].price, Decimal::new(55, 1));
    }

    #[tokio::test]
    async fn test_resolve_reports_all_missing_sorted() {
        let resolver = PricingResolver::new(store());
        let err = resolver
            .resolve(&["zz", "m1", "ghost", "zz"])
            .await
            .unwrap_err();

        match err {
            OrderError::UnknownItem(ids) => assert_eq!(ids, vec!["ghost", "zz"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
