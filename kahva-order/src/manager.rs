use std::sync::Arc;
use uuid::Uuid;

use kahva_core::directory::Directory;
use kahva_core::identity::{Actor, Role};

use crate::error::OrderError;
use crate::models::{FulfillmentMode, Order, OrderStatus};
use crate::repository::{AssignOutcome, OrderRepository};

/// Actions a caller can request against an order
#[derive(Debug, Clone)]
pub enum OrderAction {
    Accept,
    Cancel,
    Assign { agent_id: Uuid },
    /// Staff-confirmed handover for pickup-mode orders
    Complete,
}

impl OrderAction {
    pub fn name(&self) -> &'static str {
        match self {
            OrderAction::Accept => "accept",
            OrderAction::Cancel => "cancel",
            OrderAction::Assign { .. } => "assign",
            OrderAction::Complete => "complete",
        }
    }
}

/// Decide the next status for (current state, action, actor), or refuse.
///
/// The whole transition table lives in this one match; an arm that is
/// missing here is a compile-visible gap, not a runtime surprise.
fn plan_transition(order: &Order, actor: &Actor, action: &OrderAction) -> Result<OrderStatus, OrderError> {
    use OrderStatus::*;

    // Terminal orders refuse everything, regardless of who asks.
    if order.status.is_terminal() {
        return Err(OrderError::invalid_transition(order.status.as_str(), action.name()));
    }

    match (order.status, action) {
        (Created, OrderAction::Accept) => {
            if !actor.role.can_manage_orders() {
                return Err(OrderError::Authorization(
                    "only branch staff can accept orders".to_string(),
                ));
            }
            Ok(Accepted)
        }
        (Created, OrderAction::Cancel) => {
            let own_order = actor.role == Role::Customer && actor.id == order.customer_id;
            if !own_order && !actor.role.can_manage_orders() {
                return Err(OrderError::Authorization(
                    "only the ordering customer or branch staff can cancel".to_string(),
                ));
            }
            Ok(Cancelled)
        }
        (Accepted, OrderAction::Cancel) => {
            // Once accepted the branch owns the order; customers are too late.
            if !actor.role.can_manage_orders() {
                return Err(OrderError::Authorization(
                    "only branch staff can cancel an accepted order".to_string(),
                ));
            }
            Ok(Cancelled)
        }
        (Accepted, OrderAction::Assign { .. }) => {
            if !actor.role.can_manage_orders() {
                return Err(OrderError::Authorization(
                    "only branch staff can assign a delivery agent".to_string(),
                ));
            }
            if order.mode != FulfillmentMode::Delivery {
                return Err(OrderError::invalid_transition(order.status.as_str(), action.name()));
            }
            Ok(Assigned)
        }
        (Accepted, OrderAction::Complete) => {
            if !actor.role.can_manage_orders() {
                return Err(OrderError::Authorization(
                    "only branch staff can complete a pickup order".to_string(),
                ));
            }
            if order.mode != FulfillmentMode::Pickup {
                return Err(OrderError::invalid_transition(order.status.as_str(), action.name()));
            }
            Ok(Delivered)
        }
        (Created | Accepted | Assigned, _) => {
            Err(OrderError::invalid_transition(order.status.as_str(), action.name()))
        }
        // Unreachable: terminal states bailed out above.
        (Delivered | Cancelled, _) => {
            Err(OrderError::invalid_transition(order.status.as_str(), action.name()))
        }
    }
}

/// Drives role-gated order lifecycle transitions.
pub struct OrderManager {
    repo: Arc<dyn OrderRepository>,
    directory: Arc<dyn Directory>,
}

impl OrderManager {
    pub fn new(repo: Arc<dyn OrderRepository>, directory: Arc<dyn Directory>) -> Self {
        Self { repo, directory }
    }

    /// Apply one transition: load, plan, then compare-and-swap at the store.
    ///
    /// Two concurrent attempts from the same prior status get exactly one
    /// winner; the loser sees `InvalidTransition` against the state the
    /// order actually reached.
    pub async fn transition(
        &self,
        order_id: Uuid,
        actor: &Actor,
        action: OrderAction,
    ) -> Result<Order, OrderError> {
        let order = self
            .repo
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("order {order_id}")))?;

        let next = plan_transition(&order, actor, &action)?;

        match &action {
            OrderAction::Assign { agent_id } => {
                self.verify_agent(*agent_id).await?;
                match self.repo.assign_delivery_agent(order_id, *agent_id).await? {
                    AssignOutcome::Assigned(_) => {}
                    AssignOutcome::StaleStatus => {
                        return Err(self.lost_race(order_id, &action).await);
                    }
                    AssignOutcome::AlreadyAssigned => {
                        return Err(OrderError::Conflict(format!(
                            "order {order_id} already has a delivery assigned"
                        )));
                    }
                }
            }
            _ => {
                let won = self.repo.transition_status(order_id, order.status, next).await?;
                if !won {
                    return Err(self.lost_race(order_id, &action).await);
                }
            }
        }

        tracing::info!(
            order_id = %order_id,
            from = order.status.as_str(),
            to = next.as_str(),
            actor = %actor.id,
            action = action.name(),
            "order transition applied"
        );

        self.repo
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("order {order_id}")))
    }

    /// The target of `assign` must be an active user holding the DELIVERY role.
    async fn verify_agent(&self, agent_id: Uuid) -> Result<(), OrderError> {
        let agent = self
            .directory
            .find_user(agent_id)
            .await?
            .ok_or_else(|| OrderError::Validation(format!("agent {agent_id} not found")))?;

        if agent.role != Role::Delivery || !agent.is_active {
            return Err(OrderError::Validation(format!(
                "user {agent_id} is not an active delivery agent"
            )));
        }
        Ok(())
    }

    /// Report the state the order actually reached so the caller learns why
    /// it lost (e.g. "order already CANCELLED").
    async fn lost_race(&self, order_id: Uuid, action: &OrderAction) -> OrderError {
        let state = match self.repo.get_order(order_id).await {
            Ok(Some(order)) => order.status.as_str().to_string(),
            _ => "UNKNOWN".to_string(),
        };
        OrderError::invalid_transition(state, action.name())
    }
}
