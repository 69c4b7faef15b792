use async_trait::async_trait;
use uuid::Uuid;

use kahva_core::error::StoreError;

use crate::models::{Delivery, DeliveryStatus, Order, OrderStatus, Payment};

/// Result of the assign-agent primitive.
#[derive(Debug, Clone)]
pub enum AssignOutcome {
    /// Status advanced and the PENDING delivery row was written.
    Assigned(Delivery),
    /// The order was no longer in the expected prior status (lost race).
    StaleStatus,
    /// A delivery row already exists for this order.
    AlreadyAssigned,
}

/// Atomic persistence primitives for the order lifecycle.
///
/// Every method is one transaction boundary: it either applies completely or
/// leaves the store untouched. Status changes are compare-and-swap — the
/// write only lands if the row still holds the expected prior status, so two
/// racing transitions never both succeed.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist the order header and all line items; all rows or none.
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn list_orders_for_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, StoreError>;

    /// CAS on the order status. `false` means the row no longer held
    /// `expected` and nothing was written.
    async fn transition_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool, StoreError>;

    /// ACCEPTED -> ASSIGNED plus the PENDING delivery row, one transaction.
    /// Enforces the 1:1 order/delivery invariant.
    async fn assign_delivery_agent(
        &self,
        order_id: Uuid,
        agent_id: Uuid,
    ) -> Result<AssignOutcome, StoreError>;

    async fn get_delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError>;

    async fn get_delivery_for_order(&self, order_id: Uuid) -> Result<Option<Delivery>, StoreError>;

    /// CAS on the delivery status alone (pickup, in-transit, failed).
    async fn advance_delivery(
        &self,
        id: Uuid,
        expected: DeliveryStatus,
        next: DeliveryStatus,
    ) -> Result<bool, StoreError>;

    /// Delivery -> DELIVERED and parent order ASSIGNED -> DELIVERED in one
    /// transaction; `false` (nothing written) if either side was stale.
    async fn complete_delivery(
        &self,
        delivery_id: Uuid,
        expected: DeliveryStatus,
    ) -> Result<bool, StoreError>;

    /// Record one settlement attempt. Fails with `StoreError::Conflict` if a
    /// COMPLETED payment already exists for the order and this row is also
    /// COMPLETED.
    async fn record_payment(&self, payment: &Payment) -> Result<(), StoreError>;

    async fn find_completed_payment(&self, order_id: Uuid) -> Result<Option<Payment>, StoreError>;

    async fn list_payments_for_order(&self, order_id: Uuid) -> Result<Vec<Payment>, StoreError>;
}
