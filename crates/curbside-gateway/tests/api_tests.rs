// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process tests of the HTTP surface.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chrono::Duration;
use curbside_gateway::{AuthConfig, GatewayState, router};
use curbside_test_utils::TestHarness;
use serde_json::{Value, json};
use tower::ServiceExt;

const TOKEN: &str = "test-token";

fn app(harness: &TestHarness) -> Router {
    router(GatewayState::new(
        harness.coordinator.clone(),
        AuthConfig {
            bearer_token: Some(TOKEN.to_string()),
        },
    ))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .expect("request");
    send(app, request).await
}

async fn start(app: &Router, actor: &str, key: &str) -> (StatusCode, Value) {
    post(
        app,
        "/v1/sessions",
        json!({"actor_id": actor, "destination_id": "D", "idempotency_key": key}),
    )
    .await
}

async fn issue_code(app: &Router) -> String {
    let (status, body) = post(app, "/v1/linking-codes", json!({"channel": "vehicle"})).await;
    assert_eq!(status, StatusCode::CREATED);
    body["code"].as_str().expect("code").to_string()
}

fn position(harness: &TestHarness, meters: f64) -> Value {
    let p = harness.position_from_destination(meters);
    json!({"latitude": p.latitude, "longitude": p.longitude, "accuracy_m": 8.0})
}

#[tokio::test]
async fn health_is_public() {
    let h = TestHarness::new().await.unwrap();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app(&h), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "healthy");
}

#[tokio::test]
async fn api_requires_bearer_token() {
    let h = TestHarness::new().await.unwrap();
    let app = app(&h);

    let missing = Request::builder()
        .method("GET")
        .uri("/v1/sessions/abc")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, missing).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");

    let wrong = Request::builder()
        .method("GET")
        .uri("/v1/sessions/abc")
        .header("authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, wrong).await.0, StatusCode::UNAUTHORIZED);

    let (status, body) = get(&app, "/v1/sessions/abc").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn auth_disabled_without_token() {
    let h = TestHarness::new().await.unwrap();
    let open = router(GatewayState::new(h.coordinator.clone(), AuthConfig::default()));
    let request = Request::builder()
        .method("POST")
        .uri("/v1/linking-codes")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"channel": "vehicle"}"#))
        .unwrap();
    assert_eq!(send(&open, request).await.0, StatusCode::CREATED);
}

#[tokio::test]
async fn start_is_idempotent_over_http() {
    let h = TestHarness::new().await.unwrap();
    let app = app(&h);

    let (status, first) = start(&app, "driver-1", "K1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["state"], "PENDING");
    assert!(first.get("redemption_code").is_none());

    let (status, replay) = start(&app, "driver-1", "K1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["session_id"], first["session_id"]);

    let (status, body) = start(&app, "driver-1", "K2").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let header_key = Request::builder()
        .method("POST")
        .uri("/v1/sessions")
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("content-type", "application/json")
        .header("idempotency-key", "K1")
        .body(Body::from(
            json!({"actor_id": "driver-1", "destination_id": "D"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, header_key).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], first["session_id"]);

    let (status, body) = post(&app, "/v1/sessions", json!({"actor_id": "driver-2"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn full_arrival_flow() {
    let h = TestHarness::new().await.unwrap();
    let app = app(&h);

    let (_, session) = post(
        &app,
        "/v1/sessions",
        json!({
            "actor_id": "driver-1",
            "destination_id": "D",
            "idempotency_key": "K1",
            "order": {"reference": "ORD-1001", "lead_time_secs": 300}
        }),
    )
    .await;
    assert_eq!(session["order"]["status"], "queued");
    let id = session["session_id"].as_str().unwrap().to_string();

    let code = issue_code(&app).await;
    let (status, body) = post(&app, &format!("/v1/sessions/{id}/link"), json!({"code": code})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "LINKED");

    let (status, body) = post(&app, &format!("/v1/sessions/{id}/link"), json!({"code": code})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = post(&app, &format!("/v1/sessions/{id}/position"), position(&h, 2_000.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["arrived"], false);
    assert_eq!(body["state"], "EN_ROUTE");
    assert!(body.get("redemption_code").is_none());
    assert_eq!(body["poll_interval_secs"], 15);

    let (status, body) = post(&app, &format!("/v1/sessions/{id}/position"), position(&h, 40.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["arrived"], true);
    let redemption = body["redemption_code"].as_str().unwrap().to_string();

    let (status, body) = get(&app, &format!("/v1/sessions/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "ARRIVED");
    assert_eq!(body["redemption_code"], redemption.as_str());
    assert_eq!(body["order"]["status"], "released");

    let (status, body) = post(&app, "/v1/redemptions", json!({"code": redemption})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "redeemed");

    let (status, body) = post(&app, "/v1/redemptions", json!({"code": redemption})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_processed");
}

#[tokio::test]
async fn position_validation_statuses() {
    let h = TestHarness::new().await.unwrap();
    let app = app(&h);
    let (_, session) = start(&app, "driver-1", "K1").await;
    let id = session["session_id"].as_str().unwrap();

    let (status, body) = post(
        &app,
        &format!("/v1/sessions/{id}/position"),
        json!({"latitude": 95.0, "longitude": 0.0}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "out_of_range");

    let (status, body) = post(
        &app,
        &format!("/v1/sessions/{id}/position"),
        json!({"latitude": "north", "longitude": 0.0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = post(&app, &format!("/v1/sessions/{id}/position"), position(&h, 10.0)).await;
    assert_eq!(status, StatusCode::CONFLICT, "pending sessions cannot report: {body}");
}

#[tokio::test]
async fn expired_code_and_attempt_bound() {
    let h = TestHarness::builder()
        .with_policy(|p| p.deadlines.max_link_attempts = 1)
        .build()
        .await
        .unwrap();
    let app = app(&h);
    let (_, session) = start(&app, "driver-1", "K1").await;
    let id = session["session_id"].as_str().unwrap();

    let code = issue_code(&app).await;
    h.clock.advance(Duration::minutes(6));
    let (status, body) = post(&app, &format!("/v1/sessions/{id}/link"), json!({"code": code})).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["kind"], "expired");
    assert!(body["error"].as_str().unwrap().contains("request a new code"));

    let (status, body) = post(&app, &format!("/v1/sessions/{id}/link"), json!({"code": "ZZZ-ZZZ"})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["kind"], "rate_limited");

    let (_, body) = get(&app, &format!("/v1/sessions/{id}")).await;
    assert_eq!(body["state"], "EXPIRED");
    assert_eq!(body["expiry_reason"], "link_attempts_exhausted");
}

#[tokio::test]
async fn lookup_by_key_and_cancel() {
    let h = TestHarness::new().await.unwrap();
    let app = app(&h);
    let (_, session) = start(&app, "driver-1", "K1").await;

    let (status, body) = get(&app, "/v1/sessions?idempotency_key=K1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], session["session_id"]);

    let (status, _) = get(&app, "/v1/sessions").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = session["session_id"].as_str().unwrap();
    let (status, body) = post(&app, &format!("/v1/sessions/{id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "CANCELED");
    let (status, _) = post(&app, &format!("/v1/sessions/{id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn session_views_name_the_destination() {
    let h = TestHarness::new().await.unwrap();
    let app = app(&h);
    let (status, created) = start(&app, "driver-1", "K1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["destination"]["id"], "D");
    assert_eq!(created["destination"]["name"], "Congress Ave");

    let id = created["session_id"].as_str().unwrap();
    let (status, body) = get(&app, &format!("/v1/sessions/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["destination_id"], "D");
    assert_eq!(body["destination"]["name"], "Congress Ave");
    assert!(body["destination"].get("recipient").is_none());
}
