use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::product::MenuItem;

/// Price-and-availability answer for one item, captured at quote time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemQuote {
    pub item_id: Uuid,
    pub name: String,
    pub unit_price_cents: i64,
    pub available: bool,
}

/// Catalog-side failures. These are transient faults; an absent or
/// unavailable item is reported through the `quote` return value instead.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog lookup failed: {0}")]
    Lookup(String),
}

/// Read-side boundary the order core consumes.
///
/// `Ok(None)` means the item does not exist; `available: false` means it
/// exists but cannot be sold right now. Both are distinguishable from a
/// lookup fault.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn quote(&self, item_id: Uuid) -> Result<Option<ItemQuote>, CatalogError>;
}

/// In-memory catalog used by tests and local development.
pub struct InMemoryCatalog {
    items: RwLock<HashMap<Uuid, MenuItem>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, item: MenuItem) {
        self.items.write().unwrap().insert(item.id, item);
    }

    pub fn set_availability(&self, item_id: Uuid, available: bool) {
        if let Some(item) = self.items.write().unwrap().get_mut(&item_id) {
            item.is_active = available;
        }
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn quote(&self, item_id: Uuid) -> Result<Option<ItemQuote>, CatalogError> {
        let items = self
            .items
            .read()
            .map_err(|_| CatalogError::Lookup("catalog lock poisoned".to_string()))?;

        Ok(items.get(&item_id).map(|item| ItemQuote {
            item_id: item.id,
            name: item.name.clone(),
            unit_price_cents: item.unit_price_cents,
            available: item.is_active,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ItemCategory;

    #[tokio::test]
    async fn test_quote_distinguishes_absent_from_unavailable() {
        let catalog = InMemoryCatalog::new();
        let item = MenuItem::new(Uuid::new_v4(), "Flat White".to_string(), ItemCategory::Espresso, 350);
        let item_id = item.id;
        catalog.insert(item);

        let quote = catalog.quote(item_id).await.unwrap().unwrap();
        assert!(quote.available);
        assert_eq!(quote.unit_price_cents, 350);

        catalog.set_availability(item_id, false);
        let quote = catalog.quote(item_id).await.unwrap().unwrap();
        assert!(!quote.available);

        assert!(catalog.quote(Uuid::new_v4()).await.unwrap().is_none());
    }
}
