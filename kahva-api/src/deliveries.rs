use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use kahva_core::identity::{Actor, Role};
use kahva_order::models::{Delivery, DeliveryStatus};
use kahva_order::OrderError;
use kahva_shared::models::events::DeliveryAdvancedEvent;

use crate::error::AppError;
use crate::state::AppState;
use crate::telemetry;

#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub agent_id: Uuid,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Delivery> for DeliveryResponse {
    fn from(delivery: Delivery) -> Self {
        Self {
            id: delivery.id,
            order_id: delivery.order_id,
            agent_id: delivery.agent_id,
            status: delivery.status,
            created_at: delivery.created_at,
            updated_at: delivery.updated_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders/{id}/delivery", get(get_order_delivery))
        .route("/deliveries/{id}", get(get_delivery))
        .route("/deliveries/{id}/pickup", post(pick_up))
        .route("/deliveries/{id}/transit", post(mark_in_transit))
        .route("/deliveries/{id}/complete", post(complete))
        .route("/deliveries/{id}/fail", post(mark_failed))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/orders/:id/delivery
pub async fn get_order_delivery(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, AppError> {
    let delivery = state
        .repo
        .get_delivery_for_order(order_id)
        .await
        .map_err(OrderError::from)?
        .ok_or_else(|| OrderError::NotFound(format!("no delivery for order {order_id}")))?;

    authorize_read(&state, &delivery, &actor).await?;
    Ok(Json(delivery.into()))
}

/// GET /v1/deliveries/:id
pub async fn get_delivery(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(delivery_id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, AppError> {
    let delivery = state
        .repo
        .get_delivery(delivery_id)
        .await
        .map_err(OrderError::from)?
        .ok_or_else(|| OrderError::NotFound(format!("delivery {delivery_id}")))?;

    authorize_read(&state, &delivery, &actor).await?;
    Ok(Json(delivery.into()))
}

/// POST /v1/deliveries/:id/pickup
pub async fn pick_up(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(delivery_id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, AppError> {
    let delivery = state.coordinator.pick_up(delivery_id, &actor).await?;
    emit_advanced(&delivery);
    Ok(Json(delivery.into()))
}

/// POST /v1/deliveries/:id/transit
pub async fn mark_in_transit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(delivery_id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, AppError> {
    let delivery = state.coordinator.mark_in_transit(delivery_id, &actor).await?;
    emit_advanced(&delivery);
    Ok(Json(delivery.into()))
}

/// POST /v1/deliveries/:id/complete
/// Flips the delivery AND its order to DELIVERED atomically
pub async fn complete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(delivery_id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, AppError> {
    let delivery = state.coordinator.complete(delivery_id, &actor).await?;
    emit_advanced(&delivery);
    Ok(Json(delivery.into()))
}

/// POST /v1/deliveries/:id/fail
pub async fn mark_failed(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(delivery_id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, AppError> {
    let delivery = state.coordinator.mark_failed(delivery_id, &actor).await?;
    emit_advanced(&delivery);
    Ok(Json(delivery.into()))
}

fn emit_advanced(delivery: &Delivery) {
    telemetry::emit(
        "delivery_advanced",
        &DeliveryAdvancedEvent {
            delivery_id: delivery.id,
            order_id: delivery.order_id,
            status: delivery.status.as_str().to_string(),
            agent_id: delivery.agent_id,
            timestamp: Utc::now().timestamp(),
        },
    );
}

/// Deliveries are read-only to customers; the owner, branch roles and the
/// bound agent may look.
async fn authorize_read(state: &AppState, delivery: &Delivery, actor: &Actor) -> Result<(), AppError> {
    if actor.role.can_manage_orders() {
        return Ok(());
    }
    if actor.role == Role::Delivery && actor.id == delivery.agent_id {
        return Ok(());
    }

    let order = state
        .repo
        .get_order(delivery.order_id)
        .await
        .map_err(OrderError::from)?;
    if order.map(|o| o.customer_id == actor.id).unwrap_or(false) {
        return Ok(());
    }

    Err(OrderError::Authorization("not allowed to view this delivery".to_string()).into())
}
