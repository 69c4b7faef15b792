use chrono::{DateTime, Utc};
use kahva_core::payment::PaymentMethod;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Accepted,
    Assigned,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Terminal orders reject every further action.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Assigned => "ASSIGNED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(OrderStatus::Created),
            "ACCEPTED" => Some(OrderStatus::Accepted),
            "ASSIGNED" => Some(OrderStatus::Assigned),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// How the customer receives the order, fixed at creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentMode {
    Delivery,
    Pickup,
}

impl FulfillmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentMode::Delivery => "DELIVERY",
            FulfillmentMode::Pickup => "PICKUP",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "DELIVERY" => Some(FulfillmentMode::Delivery),
            "PICKUP" => Some(FulfillmentMode::Pickup),
            _ => None,
        }
    }
}

/// Delivery sub-state, advanced by the bound agent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    PickedUp,
    InTransit,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::PickedUp => "PICKED_UP",
            DeliveryStatus::InTransit => "IN_TRANSIT",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Failed => "FAILED",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(DeliveryStatus::Pending),
            "PICKED_UP" => Some(DeliveryStatus::PickedUp),
            "IN_TRANSIT" => Some(DeliveryStatus::InTransit),
            "DELIVERED" => Some(DeliveryStatus::Delivered),
            "FAILED" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "COMPLETED" => Some(PaymentStatus::Completed),
            "FAILED" => Some(PaymentStatus::Failed),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// The single source of truth for a customer's purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub branch_id: Uuid,
    pub mode: FulfillmentMode,
    pub delivery_address: Option<String>,
    pub items: Vec<OrderLineItem>,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        customer_id: Uuid,
        branch_id: Uuid,
        mode: FulfillmentMode,
        delivery_address: Option<String>,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            branch_id,
            mode,
            delivery_address,
            items: Vec::new(),
            total_cents: 0,
            status: OrderStatus::Created,
            notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a priced line item; keeps the running total in sync
    pub fn add_item(&mut self, item: OrderLineItem) {
        self.total_cents += item.line_total_cents();
        self.items.push(item);
        self.updated_at = Utc::now();
    }

    /// Flat surcharge applied once for delivery-mode orders
    pub fn apply_surcharge(&mut self, cents: i64) {
        self.total_cents += cents;
        self.updated_at = Utc::now();
    }
}

/// A priced (item, quantity) snapshot belonging to one order.
///
/// The unit price is captured at order time; later catalog changes never
/// touch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

impl OrderLineItem {
    pub fn new(order_id: Uuid, item_id: Uuid, name: String, quantity: i32, unit_price_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            item_id,
            name,
            quantity,
            unit_price_cents,
        }
    }

    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity as i64
    }
}

/// Physical fulfillment record for a delivery-mode order, 1:1 with its order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub order_id: Uuid,
    pub agent_id: Uuid,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    pub fn new(order_id: Uuid, agent_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            agent_id,
            status: DeliveryStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One settlement attempt for an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn completed(order_id: Uuid, amount_cents: i64, method: PaymentMethod, transaction_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            amount_cents,
            method,
            status: PaymentStatus::Completed,
            transaction_id: Some(transaction_id),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn failed(order_id: Uuid, amount_cents: i64, method: PaymentMethod) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            amount_cents,
            method,
            status: PaymentStatus::Failed,
            transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_tracks_line_items() {
        let mut order = Order::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            FulfillmentMode::Delivery,
            Some("12 Bean St".to_string()),
            None,
        );

        order.add_item(OrderLineItem::new(order.id, Uuid::new_v4(), "Latte".to_string(), 2, 300));
        order.add_item(OrderLineItem::new(order.id, Uuid::new_v4(), "Mocha".to_string(), 1, 450));
        order.apply_surcharge(200);

        assert_eq!(order.total_cents, 1250);
        assert_eq!(order.status, OrderStatus::Created);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Assigned.is_terminal());
        assert!(DeliveryStatus::Failed.is_terminal());
        assert!(!DeliveryStatus::InTransit.is_terminal());
    }
}
