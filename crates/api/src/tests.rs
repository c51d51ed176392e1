use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use innkeep_core::{AuthPolicy, AuthService, BootstrapAdmin, Database};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;

const ADMIN_PASSWORD: &str = "front-desk-1";

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    AuthService::new(&db, AuthPolicy::default())
        .bootstrap_admin(&BootstrapAdmin {
            username: "admin".into(),
            password: ADMIN_PASSWORD.into(),
            email: "admin@innkeep.test".into(),
        })
        .unwrap();
    router(AppState::new(db, AuthPolicy::default()))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn create_room(app: &Router, token: &str, number: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/rooms",
        Some(token),
        Some(json!({
            "room_number": number,
            "room_type": "deluxe",
            "floor": 1,
            "capacity": 2,
            "price_per_night": 750000.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

fn booking(room_id: &str, email: &str, check_in: &str, check_out: &str) -> Value {
    json!({
        "guest": { "first_name": "Ana", "last_name": "Lee", "email": email },
        "room_id": room_id,
        "check_in_date": check_in,
        "check_out_date": check_out
    })
}

#[tokio::test]
async fn test_login_returns_token_and_staff() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": ADMIN_PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["timestamp"].is_string());
    assert!(body["data"]["expires_at"].is_string());
    assert_eq!(body["data"]["staff"]["username"], "admin");
    assert!(body["data"]["staff"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "nope-nope" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"], Value::Null);
}

#[tokio::test]
async fn test_repeated_failures_lock_account() {
    let app = app();
    for _ in 0..AuthPolicy::default().max_login_attempts {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_requests_without_session_are_rejected() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/rooms", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let bogus = uuid::Uuid::new_v4().to_string();
    let (status, _) = send(&app, Method::GET, "/api/rooms", Some(&bogus), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let app = app();
    let token = login(&app, "admin", ADMIN_PASSWORD).await;

    let request = Request::builder()
        .uri("/api/auth/check")
        .header(header::COOKIE, format!("theme=dark; innkeep_session={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let app = app();
    let token = login(&app, "admin", ADMIN_PASSWORD).await;

    let (status, _) = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/api/auth/check", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app();
    let token = login(&app, "admin", ADMIN_PASSWORD).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/rooms")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"room_number\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_missing_room_field_is_unprocessable() {
    let app = app();
    let token = login(&app, "admin", ADMIN_PASSWORD).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/rooms",
        Some(&token),
        Some(json!({ "room_number": "101", "room_type": "standard" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("floor"));
}

#[tokio::test]
async fn test_unknown_room_is_not_found() {
    let app = app();
    let token = login(&app, "admin", ADMIN_PASSWORD).await;
    let uri = format!("/api/rooms/{}", uuid::Uuid::new_v4());

    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_double_booking_is_conflict_with_reason() {
    let app = app();
    let token = login(&app, "admin", ADMIN_PASSWORD).await;
    let room_id = create_room(&app, &token, "201").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/reservations",
        Some(&token),
        Some(booking(&room_id, "ana@example.com", "2030-01-10", "2030-01-13")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "confirmed");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/reservations",
        Some(&token),
        Some(booking(&room_id, "bo@example.com", "2030-01-12", "2030-01-14")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["reason"], "room_unavailable");

    // Same-day turnover is fine
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/reservations",
        Some(&token),
        Some(booking(&room_id, "bo@example.com", "2030-01-13", "2030-01-14")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_availability_and_search_endpoints() {
    let app = app();
    let token = login(&app, "admin", ADMIN_PASSWORD).await;
    let booked = create_room(&app, &token, "301").await;
    let free = create_room(&app, &token, "302").await;

    send(
        &app,
        Method::POST,
        "/api/reservations",
        Some(&token),
        Some(booking(&booked, "ana@example.com", "2030-02-01", "2030-02-03")),
    )
    .await;

    let uri = format!(
        "/api/reservations/availability?room_id={booked}&check_in=2030-02-02&check_out=2030-02-04"
    );
    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available"], false);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/rooms/available?check_in=2030-02-01&check_out=2030-02-02",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![free.as_str()]);
}

#[tokio::test]
async fn test_invalid_transition_is_conflict_with_reason() {
    let app = app();
    let token = login(&app, "admin", ADMIN_PASSWORD).await;
    let room_id = create_room(&app, &token, "401").await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/reservations",
        Some(&token),
        Some(booking(&room_id, "ana@example.com", "2030-03-01", "2030-03-02")),
    )
    .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/reservations/{id}/status"),
        Some(&token),
        Some(json!({ "status": "checked_out" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["data"]["reason"], "invalid_transition");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/reservations/{id}/cancel"),
        Some(&token),
        Some(json!({ "reason": "Flight cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["cancellation_reason"], "Flight cancelled");
}

#[tokio::test]
async fn test_reversed_dates_are_unprocessable() {
    let app = app();
    let token = login(&app, "admin", ADMIN_PASSWORD).await;
    let room_id = create_room(&app, &token, "501").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/reservations",
        Some(&token),
        Some(booking(&room_id, "ana@example.com", "2030-04-05", "2030-04-05")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_housekeeping_permissions() {
    let app = app();
    let admin = login(&app, "admin", ADMIN_PASSWORD).await;
    let room_id = create_room(&app, &admin, "601").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        Some(&admin),
        Some(json!({
            "username": "maria",
            "email": "maria@innkeep.test",
            "password": "clean-rooms",
            "role": "housekeeping"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let maid = login(&app, "maria", "clean-rooms").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/rooms",
        Some(&maid),
        Some(json!({
            "room_number": "602",
            "room_type": "standard",
            "floor": 6,
            "capacity": 2,
            "price_per_night": 1.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/rooms/{room_id}/status"),
        Some(&maid),
        Some(json!({ "status": "cleaning" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cleaning");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/rooms/{room_id}/cleaned"),
        Some(&maid),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "available");
    assert!(body["data"]["last_cleaned"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        Some(&maid),
        Some(json!({
            "username": "eve",
            "email": "eve@innkeep.test",
            "password": "sneaky-one",
            "role": "admin"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_payment_marks_reservation_paid() {
    let app = app();
    let token = login(&app, "admin", ADMIN_PASSWORD).await;
    let room_id = create_room(&app, &token, "701").await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/reservations",
        Some(&token),
        Some(booking(&room_id, "ana@example.com", "2030-05-01", "2030-05-03")),
    )
    .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["total_amount"], 1_500_000.0);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/payments",
        Some(&token),
        Some(json!({
            "reservation_id": id,
            "amount": 1_500_000.0,
            "payment_method": "cash",
            "status": "completed"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/reservations/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"]["payment_status"], "paid");
    assert_eq!(body["data"]["nights"], 2);
}

#[tokio::test]
async fn test_dashboard_counts_rooms() {
    let app = app();
    let token = login(&app, "admin", ADMIN_PASSWORD).await;
    create_room(&app, &token, "801").await;
    create_room(&app, &token, "802").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/dashboard?date=2030-06-01",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_rooms"], 2);
    assert_eq!(body["data"]["date"], "2030-06-01");
}
