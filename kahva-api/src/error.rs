use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use kahva_order::OrderError;

#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    Order(OrderError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Order(err) => match &err {
                OrderError::Validation(_) | OrderError::ItemUnavailable(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                OrderError::Authorization(_) => (StatusCode::FORBIDDEN, err.to_string()),
                OrderError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                // The body names the state the order is actually stuck in.
                OrderError::InvalidTransition { .. } | OrderError::Conflict(_) => {
                    (StatusCode::CONFLICT, err.to_string())
                }
                OrderError::Catalog(_) | OrderError::Store(_) => {
                    tracing::error!("Infrastructure fault: {}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
                }
            },
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        Self::Order(err)
    }
}
