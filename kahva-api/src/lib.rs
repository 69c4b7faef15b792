use axum::{http::Method, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod deliveries;
pub mod error;
pub mod middleware;
pub mod orders;
pub mod payments;
pub mod state;
pub mod telemetry;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Every /v1 route runs behind the actor extraction middleware.
    let protected = Router::new()
        .merge(orders::routes())
        .merge(deliveries::routes())
        .merge(payments::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::actor_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/v1", protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
