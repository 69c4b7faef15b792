use std::sync::Arc;
use uuid::Uuid;

use kahva_catalog::lookup::CatalogLookup;
use kahva_core::directory::Directory;

use crate::error::OrderError;
use crate::models::{FulfillmentMode, Order, OrderLineItem};
use crate::repository::OrderRepository;

/// Pricing knobs for order assembly
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Flat surcharge added once to delivery-mode orders
    pub delivery_fee_cents: i64,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            delivery_fee_cents: 200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CartLine {
    pub item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct NewOrderRequest {
    pub customer_id: Uuid,
    pub branch_id: Uuid,
    pub mode: FulfillmentMode,
    pub lines: Vec<CartLine>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

/// Turns a cart into a priced, persisted order.
///
/// Unit prices are captured from the catalog at assembly time; the header and
/// every line item land in one store transaction, so a failure anywhere
/// leaves no partial order behind.
pub struct OrderAssembler {
    catalog: Arc<dyn CatalogLookup>,
    directory: Arc<dyn Directory>,
    repo: Arc<dyn OrderRepository>,
    config: AssemblyConfig,
}

impl OrderAssembler {
    pub fn new(
        catalog: Arc<dyn CatalogLookup>,
        directory: Arc<dyn Directory>,
        repo: Arc<dyn OrderRepository>,
        config: AssemblyConfig,
    ) -> Self {
        Self {
            catalog,
            directory,
            repo,
            config,
        }
    }

    pub async fn assemble(&self, req: NewOrderRequest) -> Result<Order, OrderError> {
        self.validate(&req)?;

        let branch = self
            .directory
            .find_branch(req.branch_id)
            .await?
            .ok_or_else(|| OrderError::Validation(format!("branch {} not found", req.branch_id)))?;
        if !branch.is_active {
            return Err(OrderError::Validation(format!("branch {} is not taking orders", branch.name)));
        }

        let address = req.delivery_address.as_ref().map(|a| a.trim().to_string());
        let mut order = Order::new(req.customer_id, req.branch_id, req.mode, address, req.notes);

        for line in &req.lines {
            let quote = self
                .catalog
                .quote(line.item_id)
                .await?
                .ok_or_else(|| OrderError::ItemUnavailable(format!("item {} not found", line.item_id)))?;
            if !quote.available {
                return Err(OrderError::ItemUnavailable(format!("{} is currently unavailable", quote.name)));
            }

            order.add_item(OrderLineItem::new(
                order.id,
                quote.item_id,
                quote.name,
                line.quantity,
                quote.unit_price_cents,
            ));
        }

        if order.mode == FulfillmentMode::Delivery {
            order.apply_surcharge(self.config.delivery_fee_cents);
        }

        self.repo.insert_order(&order).await?;

        tracing::info!(order_id = %order.id, total_cents = order.total_cents, "order assembled");
        Ok(order)
    }

    fn validate(&self, req: &NewOrderRequest) -> Result<(), OrderError> {
        if req.lines.is_empty() {
            return Err(OrderError::Validation("cart is empty".to_string()));
        }
        if req.lines.iter().any(|l| l.quantity < 1) {
            return Err(OrderError::Validation("line quantity must be at least 1".to_string()));
        }

        match req.mode {
            FulfillmentMode::Delivery => {
                let blank = req
                    .delivery_address
                    .as_deref()
                    .map(|a| a.trim().is_empty())
                    .unwrap_or(true);
                if blank {
                    return Err(OrderError::Validation(
                        "delivery orders require a delivery address".to_string(),
                    ));
                }
            }
            FulfillmentMode::Pickup => {
                if req.delivery_address.is_some() {
                    return Err(OrderError::Validation(
                        "pickup orders must not carry a delivery address".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::models::OrderStatus;
    use kahva_catalog::{InMemoryCatalog, ItemCategory, MenuItem};
    use kahva_core::directory::Branch;

    struct Fixture {
        assembler: OrderAssembler,
        store: Arc<MemoryStore>,
        branch_id: Uuid,
        latte_id: Uuid,
        mocha_id: Uuid,
        catalog: Arc<InMemoryCatalog>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let catalog = Arc::new(InMemoryCatalog::new());

        let branch_id = Uuid::new_v4();
        store
            .add_branch(Branch {
                id: branch_id,
                name: "Harbor Road".to_string(),
                is_active: true,
            })
            .await;

        let latte = MenuItem::new(branch_id, "Latte".to_string(), ItemCategory::Espresso, 300);
        let mocha = MenuItem::new(branch_id, "Mocha".to_string(), ItemCategory::Espresso, 450);
        let latte_id = latte.id;
        let mocha_id = mocha.id;
        catalog.insert(latte);
        catalog.insert(mocha);

        let assembler = OrderAssembler::new(
            catalog.clone(),
            store.clone(),
            store.clone(),
            AssemblyConfig {
                delivery_fee_cents: 200,
            },
        );

        Fixture {
            assembler,
            store,
            branch_id,
            latte_id,
            mocha_id,
            catalog,
        }
    }

    fn delivery_request(f: &Fixture) -> NewOrderRequest {
        NewOrderRequest {
            customer_id: Uuid::new_v4(),
            branch_id: f.branch_id,
            mode: FulfillmentMode::Delivery,
            lines: vec![
                CartLine { item_id: f.latte_id, quantity: 2 },
                CartLine { item_id: f.mocha_id, quantity: 1 },
            ],
            delivery_address: Some("12 Bean St".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_totals_capture_price_and_surcharge() {
        let f = fixture().await;
        let order = f.assembler.assemble(delivery_request(&f)).await.unwrap();

        // 2 x 3.00 + 1 x 4.50 + 2.00 delivery fee
        assert_eq!(order.total_cents, 1250);
        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.items.len(), 2);

        // Catalog price changes after assembly never touch the snapshot.
        f.catalog.insert(MenuItem {
            id: f.latte_id,
            branch_id: f.branch_id,
            name: "Latte".to_string(),
            category: ItemCategory::Espresso,
            unit_price_cents: 999,
            is_active: true,
        });
        let stored = f.store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.total_cents, 1250);
    }

    #[tokio::test]
    async fn test_pickup_order_skips_surcharge() {
        let f = fixture().await;
        let mut req = delivery_request(&f);
        req.mode = FulfillmentMode::Pickup;
        req.delivery_address = None;

        let order = f.assembler.assemble(req).await.unwrap();
        assert_eq!(order.total_cents, 1050);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected_without_writes() {
        let f = fixture().await;
        let mut req = delivery_request(&f);
        let customer_id = req.customer_id;
        req.lines.clear();

        let err = f.assembler.assemble(req).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
        assert!(f.store.list_orders_for_customer(customer_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_requires_address() {
        let f = fixture().await;
        let mut req = delivery_request(&f);
        req.delivery_address = Some("   ".to_string());

        let err = f.assembler.assemble(req).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unavailable_item_rejected_without_writes() {
        let f = fixture().await;
        f.catalog.set_availability(f.mocha_id, false);
        let req = delivery_request(&f);
        let customer_id = req.customer_id;

        let err = f.assembler.assemble(req).await.unwrap_err();
        assert!(matches!(err, OrderError::ItemUnavailable(_)));
        assert!(f.store.list_orders_for_customer(customer_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_branch_rejected() {
        let f = fixture().await;
        let mut req = delivery_request(&f);
        req.branch_id = Uuid::new_v4();

        let err = f.assembler.assemble(req).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }
}
