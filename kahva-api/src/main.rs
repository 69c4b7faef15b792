use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use kahva_api::{
    app,
    state::{AppState, AuthConfig},
};
use kahva_catalog::lookup::CatalogLookup;
use kahva_core::directory::Directory;
use kahva_core::payment::SettlementGateway;
use kahva_order::repository::OrderRepository;
use kahva_order::{
    AssemblyConfig, DeliveryCoordinator, OrderAssembler, OrderManager, SettlementConfig,
    SettlementService, SimulatedGateway,
};
use kahva_store::{DbClient, PgCatalog, PgDirectory, PgOrderRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kahva_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = kahva_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Kahva API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let repo: Arc<dyn OrderRepository> = Arc::new(PgOrderRepository::new(db.pool.clone()));
    let directory: Arc<dyn Directory> = Arc::new(PgDirectory::new(db.pool.clone()));
    let catalog: Arc<dyn CatalogLookup> = Arc::new(PgCatalog::new(db.pool.clone()));
    let gateway: Arc<dyn SettlementGateway> = Arc::new(SimulatedGateway {
        decline_over_cents: config.business_rules.decline_over_cents,
        outage: false,
    });

    let assembler = Arc::new(OrderAssembler::new(
        catalog,
        directory.clone(),
        repo.clone(),
        AssemblyConfig {
            delivery_fee_cents: config.business_rules.delivery_fee_cents,
        },
    ));
    let manager = Arc::new(OrderManager::new(repo.clone(), directory));
    let coordinator = Arc::new(DeliveryCoordinator::new(repo.clone()));
    let settlement = Arc::new(SettlementService::new(
        repo.clone(),
        gateway,
        SettlementConfig {
            timeout: Duration::from_millis(config.business_rules.settlement_timeout_ms),
        },
    ));

    let app_state = AppState {
        repo,
        assembler,
        manager,
        coordinator,
        settlement,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
