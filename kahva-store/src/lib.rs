pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod directory_repo;
pub mod order_repo;

pub use catalog_repo::PgCatalog;
pub use database::DbClient;
pub use directory_repo::PgDirectory;
pub use order_repo::PgOrderRepository;

use kahva_core::error::StoreError;

/// Collapse driver errors into the shared store-fault taxonomy.
pub(crate) fn map_sqlx_err(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::PoolTimedOut => StoreError::Timeout("connection pool exhausted".to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Unavailable(e.to_string()),
    }
}
