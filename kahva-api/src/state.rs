use std::sync::Arc;

use kahva_order::repository::OrderRepository;
use kahva_order::{DeliveryCoordinator, OrderAssembler, OrderManager, SettlementService};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn OrderRepository>,
    pub assembler: Arc<OrderAssembler>,
    pub manager: Arc<OrderManager>,
    pub coordinator: Arc<DeliveryCoordinator>,
    pub settlement: Arc<SettlementService>,
    pub auth: AuthConfig,
}
