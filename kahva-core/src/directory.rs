use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::identity::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}

/// Lookup boundary for users and branches.
///
/// User/branch CRUD lives outside the order core; the state machine only
/// needs to answer "does this agent exist with the DELIVERY role" and
/// "is this branch open for orders".
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError>;

    async fn find_branch(&self, id: Uuid) -> Result<Option<Branch>, StoreError>;
}
