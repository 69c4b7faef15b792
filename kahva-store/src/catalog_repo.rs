use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use kahva_catalog::lookup::{CatalogError, CatalogLookup, ItemQuote};

pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MenuItemRow {
    id: Uuid,
    name: String,
    unit_price_cents: i64,
    is_active: bool,
}

#[async_trait]
impl CatalogLookup for PgCatalog {
    async fn quote(&self, item_id: Uuid) -> Result<Option<ItemQuote>, CatalogError> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            "SELECT id, name, unit_price_cents, is_active FROM menu_items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CatalogError::Lookup(e.to_string()))?;

        Ok(row.map(|row| ItemQuote {
            item_id: row.id,
            name: row.name,
            unit_price_cents: row.unit_price_cents,
            available: row.is_active,
        }))
    }
}
