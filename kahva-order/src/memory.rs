use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use kahva_core::directory::{Branch, Directory, UserProfile};
use kahva_core::error::StoreError;

use crate::models::{Delivery, DeliveryStatus, Order, OrderStatus, Payment, PaymentStatus};
use crate::repository::{AssignOutcome, OrderRepository};

#[derive(Default)]
struct Inner {
    orders: HashMap<Uuid, Order>,
    deliveries: HashMap<Uuid, Delivery>,
    payments: HashMap<Uuid, Payment>,
    users: HashMap<Uuid, UserProfile>,
    branches: HashMap<Uuid, Branch>,
}

/// In-memory store for tests and local development.
///
/// One mutex guards the whole state, so every repository call is a single
/// critical section and the compare-and-swap contract holds under
/// concurrent callers exactly as it does for the row-locked SQL store.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub async fn add_user(&self, user: UserProfile) {
        self.inner.lock().await.users.insert(user.id, user);
    }

    pub async fn add_branch(&self, branch: Branch) {
        self.inner.lock().await.branches.insert(branch.id, branch);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.orders.contains_key(&order.id) {
            return Err(StoreError::Conflict(format!("order {} already exists", order.id)));
        }
        inner.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.lock().await.orders.get(&id).cloned())
    }

    async fn list_orders_for_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.orders.get_mut(&id) {
            Some(order) if order.status == expected => {
                order.status = next;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn assign_delivery_agent(
        &self,
        order_id: Uuid,
        agent_id: Uuid,
    ) -> Result<AssignOutcome, StoreError> {
        let mut inner = self.inner.lock().await;

        if inner.deliveries.values().any(|d| d.order_id == order_id) {
            return Ok(AssignOutcome::AlreadyAssigned);
        }

        match inner.orders.get_mut(&order_id) {
            Some(order) if order.status == OrderStatus::Accepted => {
                order.status = OrderStatus::Assigned;
                order.updated_at = Utc::now();
            }
            _ => return Ok(AssignOutcome::StaleStatus),
        }

        let delivery = Delivery::new(order_id, agent_id);
        inner.deliveries.insert(delivery.id, delivery.clone());
        Ok(AssignOutcome::Assigned(delivery))
    }

    async fn get_delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        Ok(self.inner.lock().await.deliveries.get(&id).cloned())
    }

    async fn get_delivery_for_order(&self, order_id: Uuid) -> Result<Option<Delivery>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.deliveries.values().find(|d| d.order_id == order_id).cloned())
    }

    async fn advance_delivery(
        &self,
        id: Uuid,
        expected: DeliveryStatus,
        next: DeliveryStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.deliveries.get_mut(&id) {
            Some(delivery) if delivery.status == expected => {
                delivery.status = next;
                delivery.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_delivery(
        &self,
        delivery_id: Uuid,
        expected: DeliveryStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;

        // Check both sides before writing either; a stale side means nothing moves.
        let order_id = match inner.deliveries.get(&delivery_id) {
            Some(delivery) if delivery.status == expected => delivery.order_id,
            _ => return Ok(false),
        };
        match inner.orders.get(&order_id) {
            Some(order) if order.status == OrderStatus::Assigned => {}
            _ => return Ok(false),
        }

        let now = Utc::now();
        if let Some(delivery) = inner.deliveries.get_mut(&delivery_id) {
            delivery.status = DeliveryStatus::Delivered;
            delivery.updated_at = now;
        }
        if let Some(order) = inner.orders.get_mut(&order_id) {
            order.status = OrderStatus::Delivered;
            order.updated_at = now;
        }
        Ok(true)
    }

    async fn record_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if payment.status == PaymentStatus::Completed {
            let duplicate = inner
                .payments
                .values()
                .any(|p| p.order_id == payment.order_id && p.status == PaymentStatus::Completed);
            if duplicate {
                return Err(StoreError::Conflict(format!(
                    "order {} already has a completed payment",
                    payment.order_id
                )));
            }
        }
        inner.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_completed_payment(&self, order_id: Uuid) -> Result<Option<Payment>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .payments
            .values()
            .find(|p| p.order_id == order_id && p.status == PaymentStatus::Completed)
            .cloned())
    }

    async fn list_payments_for_order(&self, order_id: Uuid) -> Result<Vec<Payment>, StoreError> {
        let inner = self.inner.lock().await;
        let mut payments: Vec<Payment> = inner
            .payments
            .values()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(payments)
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn find_branch(&self, id: Uuid) -> Result<Option<Branch>, StoreError> {
        Ok(self.inner.lock().await.branches.get(&id).cloned())
    }
}
