//! Innkeep HTTP API
//!
//! JSON routes under `/api` over the core booking engine. Every response is
//! wrapped in the `{ success, message, data, timestamp }` envelope.

pub mod dto;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;
use tracing::{info, Instrument};
use uuid::Uuid;

pub use error::ApiError;
pub use state::AppState;

use handlers::{auth, dashboard, guests, payments, reservations, rooms};

/// Build the full API router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/check", get(auth::check))
        .route("/auth/profile", get(auth::profile))
        .route("/auth/password", put(auth::change_password))
        .route("/auth/register", post(auth::register))
        .route("/rooms", get(rooms::list).post(rooms::create))
        .route("/rooms/available", get(rooms::available))
        .route(
            "/rooms/:id",
            get(rooms::get).put(rooms::update).delete(rooms::delete),
        )
        .route("/rooms/:id/status", put(rooms::set_status))
        .route("/rooms/:id/cleaned", post(rooms::mark_cleaned))
        .route("/guests", get(guests::list).post(guests::create))
        .route(
            "/guests/:id",
            get(guests::get).put(guests::update).delete(guests::delete),
        )
        .route("/guests/:id/reservations", get(guests::reservations))
        .route("/guests/:id/summary", get(guests::summary))
        .route("/guests/:id/loyalty", post(guests::loyalty))
        .route(
            "/reservations",
            get(reservations::list).post(reservations::create),
        )
        .route("/reservations/availability", get(reservations::availability))
        .route("/reservations/arrivals", get(reservations::arrivals))
        .route("/reservations/departures", get(reservations::departures))
        .route("/reservations/code/:code", get(reservations::by_code))
        .route(
            "/reservations/:id",
            get(reservations::get)
                .put(reservations::update)
                .delete(reservations::delete),
        )
        .route("/reservations/:id/status", put(reservations::set_status))
        .route("/reservations/:id/cancel", put(reservations::cancel))
        .route("/payments", get(payments::list).post(payments::create))
        .route("/payments/:id", get(payments::get))
        .route("/payments/:id/status", put(payments::set_status))
        .route("/payments/:id/refund", post(payments::refund))
        .route("/dashboard", get(dashboard::summary));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn(request_tracing))
        .with_state(state)
}

/// Wrap each request in an `http.request` span and tag the response with its id
async fn request_tracing(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %request.method(),
        route = %request.uri().path(),
    );

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request finished"
        )
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

#[cfg(test)]
mod tests;
