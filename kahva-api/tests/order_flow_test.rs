use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use kahva_api::middleware::Claims;
use kahva_api::state::{AppState, AuthConfig};
use kahva_api::app;
use kahva_catalog::lookup::CatalogLookup;
use kahva_catalog::{InMemoryCatalog, ItemCategory, MenuItem};
use kahva_core::directory::{Branch, Directory, UserProfile};
use kahva_core::identity::Role;
use kahva_core::payment::SettlementGateway;
use kahva_order::repository::OrderRepository;
use kahva_order::{
    AssemblyConfig, DeliveryCoordinator, MemoryStore, OrderAssembler, OrderManager,
    SettlementConfig, SettlementService, SimulatedGateway,
};

const SECRET: &str = "integration-test-secret";

struct TestEnv {
    app: Router,
    branch_id: Uuid,
    latte_id: Uuid,
    mocha_id: Uuid,
    customer: Uuid,
    staff: Uuid,
    agent: Uuid,
}

async fn test_env() -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    let catalog = Arc::new(InMemoryCatalog::new());

    let branch_id = Uuid::new_v4();
    store
        .add_branch(Branch {
            id: branch_id,
            name: "Harbor Road".to_string(),
            is_active: true,
        })
        .await;

    let agent = Uuid::new_v4();
    store
        .add_user(UserProfile {
            id: agent,
            name: "Agent X".to_string(),
            role: Role::Delivery,
            is_active: true,
        })
        .await;

    let latte = MenuItem::new(branch_id, "Latte".to_string(), ItemCategory::Espresso, 300);
    let mocha = MenuItem::new(branch_id, "Mocha".to_string(), ItemCategory::Espresso, 450);
    let latte_id = latte.id;
    let mocha_id = mocha.id;
    catalog.insert(latte);
    catalog.insert(mocha);

    let repo: Arc<dyn OrderRepository> = store.clone();
    let directory: Arc<dyn Directory> = store.clone();
    let catalog: Arc<dyn CatalogLookup> = catalog;
    let gateway: Arc<dyn SettlementGateway> = Arc::new(SimulatedGateway::approving());

    let assembler = Arc::new(OrderAssembler::new(
        catalog,
        directory.clone(),
        repo.clone(),
        AssemblyConfig {
            delivery_fee_cents: 200,
        },
    ));
    let manager = Arc::new(OrderManager::new(repo.clone(), directory));
    let coordinator = Arc::new(DeliveryCoordinator::new(repo.clone()));
    let settlement = Arc::new(SettlementService::new(
        repo.clone(),
        gateway,
        SettlementConfig {
            timeout: Duration::from_secs(1),
        },
    ));

    let state = AppState {
        repo,
        assembler,
        manager,
        coordinator,
        settlement,
        auth: AuthConfig {
            secret: SECRET.to_string(),
        },
    };

    TestEnv {
        app: app(state),
        branch_id,
        latte_id,
        mocha_id,
        customer: Uuid::new_v4(),
        staff: Uuid::new_v4(),
        agent,
    }
}

fn token(sub: Uuid, role: Role) -> String {
    let claims = Claims {
        sub,
        role,
        exp: 4102444800, // far future
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header("authorization", format!("Bearer {bearer}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn delivery_cart(env: &TestEnv) -> Value {
    json!({
        "branch_id": env.branch_id,
        "mode": "DELIVERY",
        "items": [
            { "item_id": env.latte_id, "quantity": 2 },
            { "item_id": env.mocha_id, "quantity": 1 },
        ],
        "delivery_address": "12 Bean St",
    })
}

#[tokio::test]
async fn test_end_to_end_delivery_and_cash_settlement() {
    let env = test_env().await;
    let customer = token(env.customer, Role::Customer);
    let staff = token(env.staff, Role::Staff);
    let agent = token(env.agent, Role::Delivery);

    // Checkout: 2 x 3.00 + 1 x 4.50 + 2.00 delivery fee = 12.50
    let (status, order) = send(&env.app, "POST", "/v1/orders", Some(&customer), Some(delivery_cart(&env))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "CREATED");
    assert_eq!(order["total"], "12.50");
    assert_eq!(order["total_cents"], 1250);
    let order_id = order["id"].as_str().unwrap().to_string();

    // Branch accepts
    let (status, order) = send(&env.app, "POST", &format!("/v1/orders/{order_id}/accept"), Some(&staff), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "ACCEPTED");

    // Staff binds the agent; a PENDING delivery appears
    let (status, order) = send(
        &env.app,
        "POST",
        &format!("/v1/orders/{order_id}/assign"),
        Some(&staff),
        Some(json!({ "agent_id": env.agent })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "ASSIGNED");

    let (status, delivery) = send(&env.app, "GET", &format!("/v1/orders/{order_id}/delivery"), Some(&agent), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(delivery["status"], "PENDING");
    assert_eq!(delivery["agent_id"], json!(env.agent));
    let delivery_id = delivery["id"].as_str().unwrap().to_string();

    // Agent picks up; the order itself stays ASSIGNED
    let (status, delivery) = send(&env.app, "POST", &format!("/v1/deliveries/{delivery_id}/pickup"), Some(&agent), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(delivery["status"], "PICKED_UP");

    let (_, order) = send(&env.app, "GET", &format!("/v1/orders/{order_id}"), Some(&customer), None).await;
    assert_eq!(order["status"], "ASSIGNED");

    // Handover: both records flip together
    let (status, delivery) = send(&env.app, "POST", &format!("/v1/deliveries/{delivery_id}/complete"), Some(&agent), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(delivery["status"], "DELIVERED");

    let (_, order) = send(&env.app, "GET", &format!("/v1/orders/{order_id}"), Some(&customer), None).await;
    assert_eq!(order["status"], "DELIVERED");

    // Cash on delivery settles for the full total
    let (status, payment) = send(
        &env.app,
        "POST",
        &format!("/v1/orders/{order_id}/payments"),
        Some(&customer),
        Some(json!({ "method": "CASH" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment["success"], true);
    assert_eq!(payment["status"], "COMPLETED");
    assert_eq!(payment["amount"], "12.50");
    assert!(payment["transaction_id"].as_str().unwrap().starts_with("KAHVA-"));

    // A second settlement attempt conflicts; still exactly one payment row
    let (status, _) = send(
        &env.app,
        "POST",
        &format!("/v1/orders/{order_id}/payments"),
        Some(&customer),
        Some(json!({ "method": "CARD" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, payments) = send(&env.app, "GET", &format!("/v1/orders/{order_id}/payments"), Some(&staff), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payments.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancelled_orders_are_terminal() {
    let env = test_env().await;
    let customer = token(env.customer, Role::Customer);
    let staff = token(env.staff, Role::Staff);

    let (status, order) = send(&env.app, "POST", "/v1/orders", Some(&customer), Some(delivery_cart(&env))).await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, order) = send(&env.app, "POST", &format!("/v1/orders/{order_id}/cancel"), Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "CANCELLED");

    // Nothing moves a cancelled order, and the caller is told why.
    let (status, body) = send(&env.app, "POST", &format!("/v1/orders/{order_id}/accept"), Some(&staff), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("CANCELLED"));

    let (status, _) = send(
        &env.app,
        "POST",
        &format!("/v1/orders/{order_id}/assign"),
        Some(&staff),
        Some(json!({ "agent_id": env.agent })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_validation_and_authorization_surface() {
    let env = test_env().await;
    let customer = token(env.customer, Role::Customer);
    let staff = token(env.staff, Role::Staff);

    // Empty cart
    let mut cart = delivery_cart(&env);
    cart["items"] = json!([]);
    let (status, _) = send(&env.app, "POST", "/v1/orders", Some(&customer), Some(cart)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Delivery order with a blank address
    let mut cart = delivery_cart(&env);
    cart["delivery_address"] = json!("   ");
    let (status, _) = send(&env.app, "POST", "/v1/orders", Some(&customer), Some(cart)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Customers cannot drive branch-side transitions
    let (_, order) = send(&env.app, "POST", "/v1/orders", Some(&customer), Some(delivery_cart(&env))).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let (status, _) = send(&env.app, "POST", &format!("/v1/orders/{order_id}/accept"), Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Staff cannot advance a delivery leg
    send(&env.app, "POST", &format!("/v1/orders/{order_id}/accept"), Some(&staff), None).await;
    send(
        &env.app,
        "POST",
        &format!("/v1/orders/{order_id}/assign"),
        Some(&staff),
        Some(json!({ "agent_id": env.agent })),
    )
    .await;
    let (_, delivery) = send(&env.app, "GET", &format!("/v1/orders/{order_id}/delivery"), Some(&staff), None).await;
    let delivery_id = delivery["id"].as_str().unwrap().to_string();
    let (status, _) = send(&env.app, "POST", &format!("/v1/deliveries/{delivery_id}/pickup"), Some(&staff), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Assigning a non-agent fails and leaves the order where it was
    let (_, order) = send(&env.app, "POST", "/v1/orders", Some(&customer), Some(delivery_cart(&env))).await;
    let second_order = order["id"].as_str().unwrap().to_string();
    send(&env.app, "POST", &format!("/v1/orders/{second_order}/accept"), Some(&staff), None).await;
    let (status, _) = send(
        &env.app,
        "POST",
        &format!("/v1/orders/{second_order}/assign"),
        Some(&staff),
        Some(json!({ "agent_id": env.staff })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, order) = send(&env.app, "GET", &format!("/v1/orders/{second_order}"), Some(&staff), None).await;
    assert_eq!(order["status"], "ACCEPTED");

    // No token, no entry
    let (status, _) = send(&env.app, "GET", "/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Health stays open
    let (status, _) = send(&env.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
