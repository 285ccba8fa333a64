//! Menu Item Repository (read-only)

use std::sync::Arc;

use shared::models::MenuItem;

use super::BaseRepository;
use crate::db::{Collection, Filter, RecordStore, StoreResult};

#[derive(Debug, Clone)]
pub struct MenuItemRepository {
    base: BaseRepository,
}

impl MenuItemRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            base: BaseRepository::new(store, Collection::MenuItems),
        }
    }

    /// Fetch every menu item whose id is in `ids` (one store call)
    pub async fn find_by_ids(&self, ids: &[&str]) -> StoreResult<Vec<MenuItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = Filter::new().in_list("id", ids.iter().copied());
        let rows = self.base.store().fetch(self.base.collection(), &filter).await?;
        self.base.decode_all(rows)
    }
}
