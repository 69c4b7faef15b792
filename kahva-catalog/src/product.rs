use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Menu item categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCategory {
    Espresso,
    Brew,
    ColdDrink,
    Tea,
    Pastry,
    Snack,
}

/// A sellable menu item at a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub category: ItemCategory,
    pub unit_price_cents: i64,
    pub is_active: bool,
}

impl MenuItem {
    pub fn new(
        branch_id: Uuid,
        name: String,
        category: ItemCategory,
        unit_price_cents: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            branch_id,
            name,
            category,
            unit_price_cents,
            is_active: true,
        }
    }
}
