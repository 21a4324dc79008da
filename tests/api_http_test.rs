//! HTTP-level smoke tests: route wiring, actor-header extraction, and
//! role gating, driven through the router with `tower::ServiceExt`.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use common::TestCtx;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use requisition_api::{api_v1_routes, auth::ActorContext, config::AppConfig, AppState};

fn test_router(ctx: &TestCtx) -> Router {
    let state = AppState {
        db: ctx.db.clone(),
        config: AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            18080,
            "test".into(),
        ),
        services: ctx.services.clone(),
    };
    Router::new().nest("/api/v1", api_v1_routes()).with_state(state)
}

fn request_with_actor(
    method: Method,
    uri: &str,
    actor: &ActorContext,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-actor-id", actor.user_id.to_string())
        .header(
            "x-actor-role",
            if actor.is_admin() { "admin" } else { "office_head" },
        );
    if let Some(office) = actor.office_id {
        builder = builder.header("x-actor-office", office.to_string());
    }

    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_needs_no_actor() {
    let ctx = TestCtx::new().await;
    let app = test_router(&ctx);

    let response = app
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = body_json(response).await;
    assert_eq!(payload["data"]["checks"]["database"], "healthy");
}

#[tokio::test]
async fn missing_actor_headers_are_rejected() {
    let ctx = TestCtx::new().await;
    let app = test_router(&ctx);

    let response = app
        .oneshot(Request::get("/api/v1/requests").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn office_heads_cannot_reach_admin_routes() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Registrar").await;
    let head = ctx.seed_office_head(office, "head_a", "secret123").await;
    let app = test_router(&ctx);

    let response = app
        .oneshot(request_with_actor(Method::GET, "/api/v1/items", &head, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_and_list_requests_over_http() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Registrar").await;
    let head = ctx.seed_office_head(office, "head_a", "secret123").await;
    let app = test_router(&ctx);

    let create = request_with_actor(
        Method::POST,
        "/api/v1/requests",
        &head,
        Some(json!({
            "items": [
                {"custom_name": "Stamp pads", "unit_type": "pcs", "quantity": 2, "price_per_unit": "45.00"}
            ]
        })),
    );
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["data"]["id"].as_str().expect("created id");
    Uuid::parse_str(id).expect("valid uuid");

    let response = app
        .oneshot(request_with_actor(Method::GET, "/api/v1/requests", &head, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listing = body_json(response).await;
    assert_eq!(listing["data"]["summary"]["total"], 1);
    assert_eq!(listing["data"]["requests"][0]["status"], "pending");
    assert_eq!(listing["data"]["requests"][0]["office_name"], "Registrar");
}

#[tokio::test]
async fn empty_request_body_maps_to_bad_request() {
    let ctx = TestCtx::new().await;
    let office = ctx.seed_office("Registrar").await;
    let head = ctx.seed_office_head(office, "head_a", "secret123").await;
    let app = test_router(&ctx);

    let response = app
        .oneshot(request_with_actor(
            Method::POST,
            "/api/v1/requests",
            &head,
            Some(json!({"items": []})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let payload = body_json(response).await;
    assert_eq!(
        payload["message"],
        "Request must contain at least one valid line item"
    );
}
