use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderCreatedEvent {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub branch_id: Uuid,
    pub mode: String,
    pub total_cents: i64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderTransitionEvent {
    pub order_id: Uuid,
    pub action: String,
    pub to: String,
    pub actor_id: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct DeliveryAdvancedEvent {
    pub delivery_id: Uuid,
    pub order_id: Uuid,
    pub status: String,
    pub agent_id: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentRecordedEvent {
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub method: String,
    pub status: String,
    pub amount_cents: i64,
    pub timestamp: i64,
}
