use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    MobileBanking,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::MobileBanking => "MOBILE_BANKING",
            PaymentMethod::Wallet => "WALLET",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "CASH" => Some(PaymentMethod::Cash),
            "CARD" => Some(PaymentMethod::Card),
            "MOBILE_BANKING" => Some(PaymentMethod::MobileBanking),
            "WALLET" => Some(PaymentMethod::Wallet),
            _ => None,
        }
    }
}

/// Outcome of one settlement attempt.
///
/// A decline is a normal business outcome, not an error; gateway errors are
/// reserved for infrastructure faults (provider unreachable, timed out).
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    Approved { transaction_id: String },
    Declined { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("settlement gateway unreachable: {0}")]
    Unreachable(String),

    #[error("settlement gateway timed out")]
    Timeout,
}

/// Swappable settlement strategy for non-cash methods.
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    /// Attempt to collect `amount_cents` for the order.
    async fn settle(
        &self,
        order_id: Uuid,
        amount_cents: i64,
        method: PaymentMethod,
    ) -> Result<SettlementOutcome, GatewayError>;
}
