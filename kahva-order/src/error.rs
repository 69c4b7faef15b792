use kahva_catalog::lookup::CatalogError;
use kahva_core::error::StoreError;

/// Business-facing error taxonomy for every core operation.
///
/// All variants except `Catalog` and `Store` are normal, user-presentable
/// outcomes. The last two are infrastructure faults and propagate to the API
/// layer for retry handling; they are never rendered as business declines.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("item unavailable: {0}")]
    ItemUnavailable(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("action {action} is not allowed while in state {state}")]
    InvalidTransition { state: String, action: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OrderError {
    pub fn invalid_transition(state: impl AsRef<str>, action: impl AsRef<str>) -> Self {
        OrderError::InvalidTransition {
            state: state.as_ref().to_string(),
            action: action.as_ref().to_string(),
        }
    }
}
