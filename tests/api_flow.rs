//! End-to-end flow through the assembled router, backed by the
//! in-memory store: register → login → create → assign → resolve,
//! plus the authorization boundaries between the three roles.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use deskserver::api_router::build_router;
use deskserver::auth::token::TokenService;
use deskserver::notify::events::EventHub;
use deskserver::notify::mailer::NullMailer;
use deskserver::notify::Dispatcher;
use deskserver::shared::state::AppState;
use deskserver::store::memory::MemoryStore;
use deskserver::tickets::TicketDesk;
use deskserver::users::Directory;

fn test_app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let notifier = Dispatcher::new(Arc::new(NullMailer), EventHub::default());
    let tokens = TokenService::from_secret("integration-test-secret-0123456789abcdef", 3600)
        .expect("failed to build token service");
    let directory = Directory::new(store.clone());
    let desk = TicketDesk::new(store.clone(), store.clone(), notifier.clone());

    build_router(Arc::new(AppState {
        directory,
        desk,
        tokens,
        notifier,
    }))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("failed to build request"),
        None => builder.body(Body::empty()).expect("failed to build request"),
    };

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is not JSON")
    };
    (status, value)
}

async fn register(app: &Router, name: &str, email: &str, role: Option<&str>) -> (String, Value) {
    let mut body = json!({
        "name": name,
        "email": email,
        "password": "a long enough password",
    });
    if let Some(role) = role {
        body["role"] = json!(role);
    }
    let (status, response) = send(app, "POST", "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {response}");
    (
        response["token"].as_str().expect("no token").to_string(),
        response["user"].clone(),
    )
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_reject_missing_and_bad_tokens() {
    let app = test_app();

    let (status, _) = send(&app, "GET", "/api/tickets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/tickets", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_returns_a_usable_token() {
    let app = test_app();
    register(&app, "Casey", "casey@example.com", None).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "casey@example.com", "password": "a long enough password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().expect("no token");

    let (status, profile) = send(&app, "GET", "/api/users/profile", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "casey@example.com");
    assert_eq!(profile["role"], "customer");
    assert!(profile.get("password_hash").is_none());
}

#[tokio::test]
async fn bad_login_is_rejected_uniformly() {
    let app = test_app();
    register(&app, "Casey", "casey@example.com", None).await;

    let (status, wrong_pw) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "casey@example.com", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status2, unknown) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "ghost@example.com", "password": "nope" })),
    )
    .await;
    assert_eq!(status2, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_pw, unknown, "credential failures must be identical");
}

#[tokio::test]
async fn duplicate_registration_is_a_bad_request() {
    let app = test_app();
    register(&app, "Casey", "casey@example.com", None).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Other",
            "email": "casey@example.com",
            "password": "something else entirely",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate_email");
}

#[tokio::test]
async fn full_ticket_flow_across_roles() {
    let app = test_app();
    let (admin_token, _) = register(&app, "Avery", "admin@example.com", Some("admin")).await;
    let (agent_token, agent) = register(&app, "Agnes", "agent@example.com", Some("agent")).await;
    let (customer_token, customer) =
        register(&app, "Casey", "customer@example.com", None).await;

    // Only customers open tickets.
    let (status, _) = send(
        &app,
        "POST",
        "/api/tickets",
        Some(&agent_token),
        Some(json!({ "title": "t", "description": "d" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, ticket) = send(
        &app,
        "POST",
        "/api/tickets",
        Some(&customer_token),
        Some(json!({ "title": "Issue with login", "description": "Unable to login" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["status"], "open");
    assert_eq!(ticket["priority"], "medium");
    assert_eq!(ticket["created_by"]["id"], customer["id"]);
    let ticket_id = ticket["id"].as_str().expect("no ticket id").to_string();

    // Customers cannot list; agents can.
    let (status, _) = send(&app, "GET", "/api/tickets", Some(&customer_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, listing) = send(&app, "GET", "/api/tickets", Some(&agent_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing.as_array().map(Vec::len), Some(1));

    // Assignment is admin-only.
    let assign_body = json!({ "user_id": agent["id"] });
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/tickets/{ticket_id}/assign"),
        Some(&agent_token),
        Some(assign_body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, assigned) = send(
        &app,
        "PUT",
        &format!("/api/tickets/{ticket_id}/assign"),
        Some(&admin_token),
        Some(assign_body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assigned["assigned_to"]["email"], "agent@example.com");

    // Agents drive status.
    let (status, closed) = send(
        &app,
        "PUT",
        &format!("/api/tickets/{ticket_id}/status"),
        Some(&agent_token),
        Some(json!({ "status": "closed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "closed");

    // The creator reads their own ticket; another customer may not.
    let (status, own) = send(
        &app,
        "GET",
        &format!("/api/tickets/{ticket_id}"),
        Some(&customer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["status"], "closed");

    let (other_token, _) = register(&app, "Dana", "dana@example.com", None).await;
    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/tickets/{ticket_id}"),
        Some(&other_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Deletion is admin-only and final.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/tickets/{ticket_id}"),
        Some(&agent_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/tickets/{ticket_id}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/tickets/{ticket_id}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_administration_is_admin_only() {
    let app = test_app();
    let (admin_token, _) = register(&app, "Avery", "admin@example.com", Some("admin")).await;
    let (customer_token, customer) =
        register(&app, "Casey", "customer@example.com", None).await;

    let (status, _) = send(&app, "GET", "/api/users", Some(&customer_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = send(&app, "GET", "/api/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().expect("not an array");
    assert_eq!(users.len(), 2);
    for user in users {
        assert!(user.get("password_hash").is_none());
    }

    let (status, promoted) = send(
        &app,
        "PUT",
        "/api/users/role",
        Some(&admin_token),
        Some(json!({ "id": customer["id"], "role": "agent" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(promoted["role"], "agent");

    // The promoted account can now list tickets.
    let (status, _) = send(&app, "GET", "/api/tickets", Some(&customer_token), None).await;
    assert_eq!(status, StatusCode::OK);
}
