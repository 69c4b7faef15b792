pub mod assembly;
pub mod delivery;
pub mod error;
pub mod manager;
pub mod memory;
pub mod models;
pub mod repository;
pub mod settlement;

pub use assembly::{AssemblyConfig, CartLine, NewOrderRequest, OrderAssembler};
pub use delivery::DeliveryCoordinator;
pub use error::OrderError;
pub use manager::{OrderAction, OrderManager};
pub use memory::MemoryStore;
pub use models::{
    Delivery, DeliveryStatus, FulfillmentMode, Order, OrderLineItem, OrderStatus, Payment,
    PaymentStatus,
};
pub use repository::{AssignOutcome, OrderRepository};
pub use settlement::{SettlementConfig, SettlementResult, SettlementService, SimulatedGateway};
