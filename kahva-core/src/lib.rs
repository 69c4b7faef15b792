pub mod directory;
pub mod error;
pub mod identity;
pub mod payment;

pub use directory::{Branch, Directory, UserProfile};
pub use error::StoreError;
pub use identity::{Actor, Role};
pub use payment::{GatewayError, PaymentMethod, SettlementGateway, SettlementOutcome};
