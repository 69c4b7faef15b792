use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use kahva_core::error::StoreError;
use kahva_core::payment::PaymentMethod;
use kahva_order::models::{
    Delivery, DeliveryStatus, FulfillmentMode, Order, OrderLineItem, OrderStatus, Payment,
    PaymentStatus,
};
use kahva_order::repository::{AssignOutcome, OrderRepository};

use crate::map_sqlx_err;

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    branch_id: Uuid,
    mode: String,
    delivery_address: Option<String>,
    total_cents: i64,
    status: String,
    notes: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(sqlx::FromRow)]
struct LineItemRow {
    id: Uuid,
    order_id: Uuid,
    item_id: Uuid,
    name: String,
    quantity: i32,
    unit_price_cents: i64,
}

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id: Uuid,
    order_id: Uuid,
    agent_id: Uuid,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    amount_cents: i64,
    method: String,
    status: String,
    transaction_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

fn corrupt(kind: &str, value: &str) -> StoreError {
    StoreError::Unavailable(format!("unrecognized {kind} value in store: {value}"))
}

fn order_from_rows(row: OrderRow, item_rows: Vec<LineItemRow>) -> Result<Order, StoreError> {
    let status = OrderStatus::parse_str(&row.status).ok_or_else(|| corrupt("order status", &row.status))?;
    let mode = FulfillmentMode::parse_str(&row.mode).ok_or_else(|| corrupt("fulfillment mode", &row.mode))?;

    let items = item_rows
        .into_iter()
        .map(|item| OrderLineItem {
            id: item.id,
            order_id: item.order_id,
            item_id: item.item_id,
            name: item.name,
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
        })
        .collect();

    Ok(Order {
        id: row.id,
        customer_id: row.customer_id,
        branch_id: row.branch_id,
        mode,
        delivery_address: row.delivery_address,
        items,
        total_cents: row.total_cents,
        status,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn delivery_from_row(row: DeliveryRow) -> Result<Delivery, StoreError> {
    let status =
        DeliveryStatus::parse_str(&row.status).ok_or_else(|| corrupt("delivery status", &row.status))?;
    Ok(Delivery {
        id: row.id,
        order_id: row.order_id,
        agent_id: row.agent_id,
        status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn payment_from_row(row: PaymentRow) -> Result<Payment, StoreError> {
    let status =
        PaymentStatus::parse_str(&row.status).ok_or_else(|| corrupt("payment status", &row.status))?;
    let method =
        PaymentMethod::parse_str(&row.method).ok_or_else(|| corrupt("payment method", &row.method))?;
    Ok(Payment {
        id: row.id,
        order_id: row.order_id,
        amount_cents: row.amount_cents,
        method,
        status,
        transaction_id: row.transaction_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, branch_id, mode, delivery_address, total_cents, status, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id)
        .bind(order.customer_id)
        .bind(order.branch_id)
        .bind(order.mode.as_str())
        .bind(&order.delivery_address)
        .bind(order.total_cents)
        .bind(order.status.as_str())
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_line_items (id, order_id, item_id, name, quantity, unit_price_cents, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.item_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, customer_id, branch_id, mode, delivery_address, total_cents, status, notes, created_at, updated_at FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, LineItemRow>(
            "SELECT id, order_id, item_id, name, quantity, unit_price_cents FROM order_line_items WHERE order_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(Some(order_from_rows(row, items)?))
    }

    async fn list_orders_for_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM orders WHERE customer_id = $1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(order) = self.get_order(id).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(next.as_str())
        .bind(id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn assign_delivery_agent(
        &self,
        order_id: Uuid,
        agent_id: Uuid,
    ) -> Result<AssignOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM deliveries WHERE order_id = $1")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;
        if existing.is_some() {
            return Ok(AssignOutcome::AlreadyAssigned);
        }

        let result = sqlx::query(
            "UPDATE orders SET status = 'ASSIGNED', updated_at = NOW() WHERE id = $1 AND status = 'ACCEPTED'",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        if result.rows_affected() != 1 {
            return Ok(AssignOutcome::StaleStatus);
        }

        let delivery = Delivery::new(order_id, agent_id);
        sqlx::query(
            r#"
            INSERT INTO deliveries (id, order_id, agent_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(delivery.id)
        .bind(delivery.order_id)
        .bind(delivery.agent_id)
        .bind(delivery.status.as_str())
        .bind(delivery.created_at)
        .bind(delivery.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(AssignOutcome::Assigned(delivery))
    }

    async fn get_delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        let row = sqlx::query_as::<_, DeliveryRow>(
            "SELECT id, order_id, agent_id, status, created_at, updated_at FROM deliveries WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(delivery_from_row).transpose()
    }

    async fn get_delivery_for_order(&self, order_id: Uuid) -> Result<Option<Delivery>, StoreError> {
        let row = sqlx::query_as::<_, DeliveryRow>(
            "SELECT id, order_id, agent_id, status, created_at, updated_at FROM deliveries WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(delivery_from_row).transpose()
    }

    async fn advance_delivery(
        &self,
        id: Uuid,
        expected: DeliveryStatus,
        next: DeliveryStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE deliveries SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(next.as_str())
        .bind(id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete_delivery(
        &self,
        delivery_id: Uuid,
        expected: DeliveryStatus,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let order_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE deliveries SET status = 'DELIVERED', updated_at = NOW() WHERE id = $1 AND status = $2 RETURNING order_id",
        )
        .bind(delivery_id)
        .bind(expected.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let Some(order_id) = order_id else {
            // Stale delivery side; the open transaction is dropped unwritten.
            return Ok(false);
        };

        let result = sqlx::query(
            "UPDATE orders SET status = 'DELIVERED', updated_at = NOW() WHERE id = $1 AND status = 'ASSIGNED'",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        if result.rows_affected() != 1 {
            return Ok(false);
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(true)
    }

    async fn record_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        // The partial unique index on (order_id) WHERE status = 'COMPLETED'
        // turns a racing second completion into a Conflict here.
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, amount_cents, method, status, transaction_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(payment.id)
        .bind(payment.order_id)
        .bind(payment.amount_cents)
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.transaction_id)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn find_completed_payment(&self, order_id: Uuid) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, order_id, amount_cents, method, status, transaction_id, created_at, updated_at FROM payments WHERE order_id = $1 AND status = 'COMPLETED'",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(payment_from_row).transpose()
    }

    async fn list_payments_for_order(&self, order_id: Uuid) -> Result<Vec<Payment>, StoreError> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, order_id, amount_cents, method, status, transaction_id, created_at, updated_at FROM payments WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.into_iter().map(payment_from_row).collect()
    }
}
