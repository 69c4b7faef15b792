use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use async_trait::async_trait;
use kahva_core::error::StoreError;
use kahva_core::identity::{Actor, Role};
use kahva_core::payment::{GatewayError, PaymentMethod, SettlementGateway, SettlementOutcome};

use crate::error::OrderError;
use crate::models::Payment;
use crate::repository::OrderRepository;

#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Hard deadline for one gateway round trip
    pub timeout: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome returned to the caller. A decline is a normal result
/// (`success: false`); only infrastructure faults surface as errors.
#[derive(Debug, Clone)]
pub struct SettlementResult {
    pub success: bool,
    pub payment: Payment,
    pub transaction_id: Option<String>,
}

/// Opaque settlement reference, e.g. KAHVA-1733745600-9F2C41AB
pub fn transaction_token() -> String {
    let timestamp = Utc::now().timestamp();
    let short_id = &Uuid::new_v4().simple().to_string()[..8];
    format!("KAHVA-{}-{}", timestamp, short_id.to_uppercase())
}

/// Records settlement attempts for orders.
///
/// Payment is advisory: no code path here touches the order's own status,
/// and order progression never waits on a completed payment
/// (cash-on-delivery stays valid end to end).
pub struct SettlementService {
    repo: Arc<dyn OrderRepository>,
    gateway: Arc<dyn SettlementGateway>,
    config: SettlementConfig,
}

impl SettlementService {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        gateway: Arc<dyn SettlementGateway>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            repo,
            gateway,
            config,
        }
    }

    pub async fn process_payment(
        &self,
        order_id: Uuid,
        payer: &Actor,
        method: PaymentMethod,
    ) -> Result<SettlementResult, OrderError> {
        let order = self
            .repo
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("order {order_id}")))?;

        if self.repo.find_completed_payment(order_id).await?.is_some() {
            return Err(OrderError::Conflict(format!(
                "order {order_id} already has a completed payment"
            )));
        }

        self.authorize_payer(&order.customer_id, payer, method)?;

        let outcome = self.settle(order_id, order.total_cents, method).await?;

        let (success, payment) = match outcome {
            SettlementOutcome::Approved { transaction_id } => {
                let payment = Payment::completed(order_id, order.total_cents, method, transaction_id);
                match self.repo.record_payment(&payment).await {
                    Ok(()) => (true, payment),
                    // A racing attempt completed first; surface it as the
                    // business conflict it is, not a store fault.
                    Err(StoreError::Conflict(msg)) => return Err(OrderError::Conflict(msg)),
                    Err(e) => return Err(e.into()),
                }
            }
            SettlementOutcome::Declined { reason } => {
                // Declined attempts are kept for the audit trail; retries
                // write new rows.
                let payment = Payment::failed(order_id, order.total_cents, method);
                self.repo.record_payment(&payment).await?;
                tracing::info!(order_id = %order_id, %reason, "settlement declined");
                (false, payment)
            }
        };

        let transaction_id = payment.transaction_id.clone();
        Ok(SettlementResult {
            success,
            payment,
            transaction_id,
        })
    }

    /// Cash settles at handover and always approves; other methods go
    /// through the gateway under a deadline.
    async fn settle(
        &self,
        order_id: Uuid,
        amount_cents: i64,
        method: PaymentMethod,
    ) -> Result<SettlementOutcome, OrderError> {
        if method == PaymentMethod::Cash {
            return Ok(SettlementOutcome::Approved {
                transaction_id: transaction_token(),
            });
        }

        let attempt = self.gateway.settle(order_id, amount_cents, method);
        match tokio::time::timeout(self.config.timeout, attempt).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(GatewayError::Timeout)) => {
                Err(StoreError::Timeout("settlement gateway".to_string()).into())
            }
            Ok(Err(GatewayError::Unreachable(msg))) => Err(StoreError::Unavailable(msg).into()),
            Err(_) => Err(StoreError::Timeout(format!(
                "settlement exceeded {:?}",
                self.config.timeout
            ))
            .into()),
        }
    }

    /// Non-cash methods draw on the customer's own instrument; cash can be
    /// handed over to staff or the delivering agent as well.
    fn authorize_payer(&self, customer_id: &Uuid, payer: &Actor, method: PaymentMethod) -> Result<(), OrderError> {
        if method == PaymentMethod::Cash {
            if payer.id == *customer_id || payer.role != Role::Customer {
                return Ok(());
            }
        } else if payer.id == *customer_id {
            return Ok(());
        }
        Err(OrderError::Authorization(
            "payer is not authorized for this order".to_string(),
        ))
    }
}

/// Deterministic stand-in for an external settlement provider.
///
/// Declines any amount above the configured ceiling; flipping `outage`
/// simulates an unreachable provider for fault-path tests.
pub struct SimulatedGateway {
    pub decline_over_cents: Option<i64>,
    pub outage: bool,
}

impl SimulatedGateway {
    pub fn approving() -> Self {
        Self {
            decline_over_cents: None,
            outage: false,
        }
    }
}

#[async_trait]
impl SettlementGateway for SimulatedGateway {
    async fn settle(
        &self,
        order_id: Uuid,
        amount_cents: i64,
        _method: PaymentMethod,
    ) -> Result<SettlementOutcome, GatewayError> {
        if self.outage {
            return Err(GatewayError::Unreachable("simulated provider outage".to_string()));
        }
        if let Some(ceiling) = self.decline_over_cents {
            if amount_cents > ceiling {
                return Ok(SettlementOutcome::Declined {
                    reason: format!("amount {amount_cents} over limit for order {order_id}"),
                });
            }
        }
        Ok(SettlementOutcome::Approved {
            transaction_id: transaction_token(),
        })
    }
}
