use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kahva_core::identity::Actor;
use kahva_core::payment::PaymentMethod;
use kahva_order::models::{Payment, PaymentStatus};
use kahva_order::OrderError;
use kahva_shared::models::events::PaymentRecordedEvent;

use crate::error::AppError;
use crate::orders::format_cents;
use crate::state::AppState;
use crate::telemetry;

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub success: bool,
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub amount: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
}

impl PaymentResponse {
    fn from_payment(payment: &Payment, success: bool) -> Self {
        Self {
            success,
            payment_id: payment.id,
            order_id: payment.order_id,
            amount: format_cents(payment.amount_cents),
            amount_cents: payment.amount_cents,
            method: payment.method,
            status: payment.status,
            transaction_id: payment.transaction_id.clone(),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/orders/{id}/payments", post(process_payment).get(list_payments))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/orders/:id/payments
/// Run one settlement attempt for the order. A decline comes back as a
/// normal response with success = false; cart clearing after a success is
/// the calling layer's job.
pub async fn process_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    // 1. Settle and record the attempt
    let result = state
        .settlement
        .process_payment(order_id, &actor, req.method)
        .await?;

    // 2. Log telemetry
    telemetry::emit(
        "payment_recorded",
        &PaymentRecordedEvent {
            payment_id: result.payment.id,
            order_id,
            method: result.payment.method.as_str().to_string(),
            status: result.payment.status.as_str().to_string(),
            amount_cents: result.payment.amount_cents,
            timestamp: Utc::now().timestamp(),
        },
    );

    Ok(Json(PaymentResponse::from_payment(&result.payment, result.success)))
}

/// GET /v1/orders/:id/payments
/// Settlement attempts for an order, oldest first
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let order = state
        .repo
        .get_order(order_id)
        .await
        .map_err(OrderError::from)?
        .ok_or_else(|| OrderError::NotFound(format!("order {order_id}")))?;

    if actor.id != order.customer_id && !actor.role.can_manage_orders() {
        return Err(OrderError::Authorization("not allowed to view these payments".to_string()).into());
    }

    let payments = state
        .repo
        .list_payments_for_order(order_id)
        .await
        .map_err(OrderError::from)?;

    let responses = payments
        .iter()
        .map(|p| {
            let success = p.status == PaymentStatus::Completed;
            PaymentResponse::from_payment(p, success)
        })
        .collect();

    Ok(Json(responses))
}
