use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use kahva_core::directory::{Branch, Directory, UserProfile};
use kahva_core::error::StoreError;
use kahva_core::identity::Role;

use crate::map_sqlx_err;

pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    role: String,
    is_active: bool,
}

#[derive(sqlx::FromRow)]
struct BranchRow {
    id: Uuid,
    name: String,
    is_active: bool,
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, role, is_active FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(|row| {
            let role = Role::parse_str(&row.role).ok_or_else(|| {
                StoreError::Unavailable(format!("unrecognized role value in store: {}", row.role))
            })?;
            Ok(UserProfile {
                id: row.id,
                name: row.name,
                role,
                is_active: row.is_active,
            })
        })
        .transpose()
    }

    async fn find_branch(&self, id: Uuid) -> Result<Option<Branch>, StoreError> {
        let row = sqlx::query_as::<_, BranchRow>(
            "SELECT id, name, is_active FROM branches WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(row.map(|row| Branch {
            id: row.id,
            name: row.name,
            is_active: row.is_active,
        }))
    }
}
