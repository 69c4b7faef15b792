use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kahva_core::identity::{Actor, Role};
use kahva_order::assembly::{CartLine, NewOrderRequest};
use kahva_order::manager::OrderAction;
use kahva_order::models::{FulfillmentMode, Order, OrderStatus};
use kahva_order::OrderError;
use kahva_shared::models::events::{OrderCreatedEvent, OrderTransitionEvent};
use kahva_shared::pii::Masked;

use crate::error::AppError;
use crate::state::AppState;
use crate::telemetry;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub branch_id: Uuid,
    pub mode: FulfillmentMode,
    pub items: Vec<CartLineRequest>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CartLineRequest {
    pub item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub agent_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub branch_id: Uuid,
    pub mode: FulfillmentMode,
    pub status: OrderStatus,
    pub delivery_address: Option<Masked<String>>,
    pub items: Vec<LineItemResponse>,
    pub total: String,
    pub total_cents: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LineItemResponse {
    pub item_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            customer_id: order.customer_id,
            branch_id: order.branch_id,
            mode: order.mode,
            status: order.status,
            delivery_address: order.delivery_address.map(Masked),
            items: order
                .items
                .iter()
                .map(|item| LineItemResponse {
                    item_id: item.item_id,
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price_cents,
                    line_total_cents: item.line_total_cents(),
                })
                .collect(),
            total: format_cents(order.total_cents),
            total_cents: order.total_cents,
            notes: order.notes,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Render integer cents as a 2-decimal amount, e.g. 1250 -> "12.50"
pub(crate) fn format_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/accept", post(accept_order))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route("/orders/{id}/assign", post(assign_order))
        .route("/orders/{id}/complete", post(complete_order))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/orders
/// Check out the caller's cart into a priced order
pub async fn create_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    // 1. Assemble and persist the priced order in one transaction
    let order = state
        .assembler
        .assemble(NewOrderRequest {
            customer_id: actor.id,
            branch_id: req.branch_id,
            mode: req.mode,
            lines: req
                .items
                .iter()
                .map(|line| CartLine {
                    item_id: line.item_id,
                    quantity: line.quantity,
                })
                .collect(),
            delivery_address: req.delivery_address,
            notes: req.notes,
        })
        .await?;

    // 2. Log telemetry
    telemetry::emit(
        "order_created",
        &OrderCreatedEvent {
            order_id: order.id,
            customer_id: order.customer_id,
            branch_id: order.branch_id,
            mode: order.mode.as_str().to_string(),
            total_cents: order.total_cents,
            timestamp: Utc::now().timestamp(),
        },
    );

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /v1/orders/:id
pub async fn get_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = load_order(&state, order_id).await?;
    authorize_read(&state, &order, &actor).await?;
    Ok(Json(order.into()))
}

/// GET /v1/orders
/// The caller's own orders, newest first
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = state
        .repo
        .list_orders_for_customer(actor.id)
        .await
        .map_err(OrderError::from)?;

    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// POST /v1/orders/:id/accept
pub async fn accept_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    transition(&state, order_id, actor, OrderAction::Accept).await
}

/// POST /v1/orders/:id/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    transition(&state, order_id, actor, OrderAction::Cancel).await
}

/// POST /v1/orders/:id/assign
/// Bind a delivery agent; creates the PENDING delivery record
pub async fn assign_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    transition(&state, order_id, actor, OrderAction::Assign { agent_id: req.agent_id }).await
}

/// POST /v1/orders/:id/complete
/// Staff-confirmed handover for pickup orders
pub async fn complete_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    transition(&state, order_id, actor, OrderAction::Complete).await
}

async fn transition(
    state: &AppState,
    order_id: Uuid,
    actor: Actor,
    action: OrderAction,
) -> Result<Json<OrderResponse>, AppError> {
    let action_name = action.name();
    let order = state.manager.transition(order_id, &actor, action).await?;

    telemetry::emit(
        "order_transition",
        &OrderTransitionEvent {
            order_id,
            action: action_name.to_string(),
            to: order.status.as_str().to_string(),
            actor_id: actor.id,
            timestamp: Utc::now().timestamp(),
        },
    );

    Ok(Json(order.into()))
}

async fn load_order(state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
    state
        .repo
        .get_order(order_id)
        .await
        .map_err(OrderError::from)?
        .ok_or_else(|| OrderError::NotFound(format!("order {order_id}")).into())
}

/// Customers see their own orders, branch roles see all, and the bound
/// delivery agent sees the order on their run.
async fn authorize_read(state: &AppState, order: &Order, actor: &Actor) -> Result<(), AppError> {
    if actor.id == order.customer_id || actor.role.can_manage_orders() {
        return Ok(());
    }
    if actor.role == Role::Delivery {
        let delivery = state
            .repo
            .get_delivery_for_order(order.id)
            .await
            .map_err(OrderError::from)?;
        if delivery.map(|d| d.agent_id == actor.id).unwrap_or(false) {
            return Ok(());
        }
    }
    Err(OrderError::Authorization("not allowed to view this order".to_string()).into())
}
