use std::sync::Arc;
use uuid::Uuid;

use kahva_core::identity::{Actor, Role};

use crate::error::OrderError;
use crate::models::{Delivery, DeliveryStatus};
use crate::repository::OrderRepository;

/// Advances delivery sub-states for the bound agent.
///
/// Delivery rows are created only by the state machine's assign transition;
/// this coordinator owns every later movement, and `complete` is the single
/// writer allowed to flip the parent order to DELIVERED (atomically with the
/// delivery's own status).
pub struct DeliveryCoordinator {
    repo: Arc<dyn OrderRepository>,
}

impl DeliveryCoordinator {
    pub fn new(repo: Arc<dyn OrderRepository>) -> Self {
        Self { repo }
    }

    /// PENDING -> PICKED_UP, by the bound agent only.
    pub async fn pick_up(&self, delivery_id: Uuid, actor: &Actor) -> Result<Delivery, OrderError> {
        let delivery = self.load(delivery_id).await?;
        self.require_bound_agent(&delivery, actor)?;

        if delivery.status != DeliveryStatus::Pending {
            return Err(OrderError::invalid_transition(delivery.status.as_str(), "pickup"));
        }
        self.advance(delivery_id, DeliveryStatus::Pending, DeliveryStatus::PickedUp, "pickup")
            .await
    }

    /// PICKED_UP -> IN_TRANSIT, optional intermediate step.
    pub async fn mark_in_transit(&self, delivery_id: Uuid, actor: &Actor) -> Result<Delivery, OrderError> {
        let delivery = self.load(delivery_id).await?;
        self.require_bound_agent(&delivery, actor)?;

        if delivery.status != DeliveryStatus::PickedUp {
            return Err(OrderError::invalid_transition(delivery.status.as_str(), "transit"));
        }
        self.advance(delivery_id, DeliveryStatus::PickedUp, DeliveryStatus::InTransit, "transit")
            .await
    }

    /// Final handover: delivery -> DELIVERED and parent order -> DELIVERED in
    /// one store transaction. Requires the goods to be with the agent
    /// (PICKED_UP or IN_TRANSIT).
    pub async fn complete(&self, delivery_id: Uuid, actor: &Actor) -> Result<Delivery, OrderError> {
        let delivery = self.load(delivery_id).await?;
        self.require_bound_agent(&delivery, actor)?;

        if !matches!(delivery.status, DeliveryStatus::PickedUp | DeliveryStatus::InTransit) {
            return Err(OrderError::invalid_transition(delivery.status.as_str(), "complete"));
        }

        let won = self.repo.complete_delivery(delivery_id, delivery.status).await?;
        if !won {
            return Err(self.lost_race(delivery_id, "complete").await);
        }

        tracing::info!(delivery_id = %delivery_id, order_id = %delivery.order_id, "delivery completed");
        self.load(delivery_id).await
    }

    /// Terminal escape valve from any non-terminal delivery state. The bound
    /// agent reports it from the road; branch staff may also record it.
    pub async fn mark_failed(&self, delivery_id: Uuid, actor: &Actor) -> Result<Delivery, OrderError> {
        let delivery = self.load(delivery_id).await?;

        let bound_agent = actor.role == Role::Delivery && actor.id == delivery.agent_id;
        if !bound_agent && !actor.role.can_manage_orders() {
            return Err(OrderError::Authorization(
                "only the assigned agent or branch staff can fail a delivery".to_string(),
            ));
        }

        if delivery.status.is_terminal() {
            return Err(OrderError::invalid_transition(delivery.status.as_str(), "fail"));
        }
        self.advance(delivery_id, delivery.status, DeliveryStatus::Failed, "fail")
            .await
    }

    async fn load(&self, delivery_id: Uuid) -> Result<Delivery, OrderError> {
        self.repo
            .get_delivery(delivery_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("delivery {delivery_id}")))
    }

    /// Customers never touch deliveries; staff drive orders, not the leg.
    fn require_bound_agent(&self, delivery: &Delivery, actor: &Actor) -> Result<(), OrderError> {
        if actor.role != Role::Delivery || actor.id != delivery.agent_id {
            return Err(OrderError::Authorization(
                "only the assigned delivery agent can advance this delivery".to_string(),
            ));
        }
        Ok(())
    }

    async fn advance(
        &self,
        delivery_id: Uuid,
        expected: DeliveryStatus,
        next: DeliveryStatus,
        action: &str,
    ) -> Result<Delivery, OrderError> {
        let won = self.repo.advance_delivery(delivery_id, expected, next).await?;
        if !won {
            return Err(self.lost_race(delivery_id, action).await);
        }
        self.load(delivery_id).await
    }

    async fn lost_race(&self, delivery_id: Uuid, action: &str) -> OrderError {
        let state = match self.repo.get_delivery(delivery_id).await {
            Ok(Some(delivery)) => delivery.status.as_str().to_string(),
            _ => "UNKNOWN".to_string(),
        };
        OrderError::invalid_transition(state, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{OrderAction, OrderManager};
    use crate::memory::MemoryStore;
    use crate::models::{FulfillmentMode, Order, OrderLineItem, OrderStatus};
    use kahva_core::directory::UserProfile;

    struct Fixture {
        coordinator: DeliveryCoordinator,
        store: Arc<MemoryStore>,
        agent: Actor,
        delivery: Delivery,
        order_id: Uuid,
    }

    /// Seed an order all the way to ASSIGNED with a PENDING delivery.
    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let staff = Actor::new(Uuid::new_v4(), Role::Staff);
        let agent = Actor::new(Uuid::new_v4(), Role::Delivery);

        store
            .add_user(UserProfile {
                id: agent.id,
                name: "Agent X".to_string(),
                role: Role::Delivery,
                is_active: true,
            })
            .await;

        let mut order = Order::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            FulfillmentMode::Delivery,
            Some("12 Bean St".to_string()),
            None,
        );
        order.add_item(OrderLineItem::new(order.id, Uuid::new_v4(), "Latte".to_string(), 1, 300));
        store.insert_order(&order).await.unwrap();

        let manager = OrderManager::new(store.clone(), store.clone());
        manager.transition(order.id, &staff, OrderAction::Accept).await.unwrap();
        manager
            .transition(order.id, &staff, OrderAction::Assign { agent_id: agent.id })
            .await
            .unwrap();

        let delivery = store.get_delivery_for_order(order.id).await.unwrap().unwrap();
        let coordinator = DeliveryCoordinator::new(store.clone());

        Fixture {
            coordinator,
            store,
            agent,
            delivery,
            order_id: order.id,
        }
    }

    #[tokio::test]
    async fn test_pickup_then_complete_flips_both_records() {
        let f = fixture().await;

        let delivery = f.coordinator.pick_up(f.delivery.id, &f.agent).await.unwrap();
        assert_eq!(delivery.status, DeliveryStatus::PickedUp);
        // The order stays ASSIGNED until the final handover.
        assert_eq!(
            f.store.get_order(f.order_id).await.unwrap().unwrap().status,
            OrderStatus::Assigned
        );

        let delivery = f.coordinator.complete(f.delivery.id, &f.agent).await.unwrap();
        assert_eq!(delivery.status, DeliveryStatus::Delivered);
        assert_eq!(
            f.store.get_order(f.order_id).await.unwrap().unwrap().status,
            OrderStatus::Delivered
        );
    }

    #[tokio::test]
    async fn test_in_transit_is_optional_but_ordered() {
        let f = fixture().await;

        let err = f.coordinator.mark_in_transit(f.delivery.id, &f.agent).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        f.coordinator.pick_up(f.delivery.id, &f.agent).await.unwrap();
        let delivery = f.coordinator.mark_in_transit(f.delivery.id, &f.agent).await.unwrap();
        assert_eq!(delivery.status, DeliveryStatus::InTransit);

        let delivery = f.coordinator.complete(f.delivery.id, &f.agent).await.unwrap();
        assert_eq!(delivery.status, DeliveryStatus::Delivered);
    }

    #[tokio::test]
    async fn test_only_bound_agent_advances() {
        let f = fixture().await;
        let other_agent = Actor::new(Uuid::new_v4(), Role::Delivery);
        let staff = Actor::new(Uuid::new_v4(), Role::Staff);

        for actor in [other_agent, staff] {
            let err = f.coordinator.pick_up(f.delivery.id, &actor).await.unwrap_err();
            assert!(matches!(err, OrderError::Authorization(_)));
        }
    }

    #[tokio::test]
    async fn test_complete_before_pickup_rejected() {
        let f = fixture().await;
        let err = f.coordinator.complete(f.delivery.id, &f.agent).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_complete_with_stale_order_side_writes_nothing() {
        let f = fixture().await;
        f.coordinator.pick_up(f.delivery.id, &f.agent).await.unwrap();

        // Force the order side out from under the paired update.
        f.store
            .transition_status(f.order_id, OrderStatus::Assigned, OrderStatus::Cancelled)
            .await
            .unwrap();

        let err = f.coordinator.complete(f.delivery.id, &f.agent).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        // Neither side moved: the delivery is still PICKED_UP.
        let delivery = f.store.get_delivery(f.delivery.id).await.unwrap().unwrap();
        assert_eq!(delivery.status, DeliveryStatus::PickedUp);
        assert_eq!(
            f.store.get_order(f.order_id).await.unwrap().unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_mark_failed_from_any_active_state() {
        let f = fixture().await;
        f.coordinator.pick_up(f.delivery.id, &f.agent).await.unwrap();

        let delivery = f.coordinator.mark_failed(f.delivery.id, &f.agent).await.unwrap();
        assert_eq!(delivery.status, DeliveryStatus::Failed);

        // Terminal: the agent cannot revive it.
        let err = f.coordinator.pick_up(f.delivery.id, &f.agent).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }
}
