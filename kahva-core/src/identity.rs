use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller roles across the platform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Staff,
    Manager,
    Delivery,
    Admin,
}

impl Role {
    /// Branch-side roles allowed to drive order progression
    pub fn can_manage_orders(&self) -> bool {
        matches!(self, Role::Staff | Role::Manager | Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Staff => "STAFF",
            Role::Manager => "MANAGER",
            Role::Delivery => "DELIVERY",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "CUSTOMER" => Some(Role::Customer),
            "STAFF" => Some(Role::Staff),
            "MANAGER" => Some(Role::Manager),
            "DELIVERY" => Some(Role::Delivery),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// The verified caller of a core operation.
///
/// Identity verification happens at the API boundary; core operations receive
/// the pair explicitly and never read ambient session state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Customer, Role::Staff, Role::Manager, Role::Delivery, Role::Admin] {
            assert_eq!(Role::parse_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse_str("BARISTA"), None);
    }

    #[test]
    fn test_order_management_roles() {
        assert!(Role::Staff.can_manage_orders());
        assert!(Role::Admin.can_manage_orders());
        assert!(!Role::Customer.can_manage_orders());
        assert!(!Role::Delivery.can_manage_orders());
    }
}
