use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use innkeep_core::{AuthService, Error, NewStaff, Staff, StaffContext, StaffRepository};
use serde::Serialize;
use serde_json::Value;

use super::ApiResult;
use crate::dto::{ChangePasswordRequest, LoginRequest, RegisterStaffRequest};
use crate::envelope::Reply;
use crate::error::ApiError;
use crate::extract::{ApiJson, Caller, SESSION_COOKIE};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub staff: Staff,
}

/// Open a session; the token is returned in the body and as a cookie
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let policy = state.policy;
    let outcome = state
        .run(move |db| AuthService::new(db, policy).login(&req.username, &req.password))
        .await?;

    let token = outcome.session.id.to_string();
    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        policy.session_hours * 3600
    );
    let body = LoginResponse {
        token,
        expires_at: outcome.session.expires_at,
        staff: outcome.staff,
    };
    Ok(([(SET_COOKIE, cookie)], Reply::ok("Login successful", body)))
}

pub async fn logout(State(state): State<AppState>, Caller(ctx): Caller) -> ApiResult<Value> {
    let policy = state.policy;
    state
        .run(move |db| AuthService::new(db, policy).logout(ctx.session_id))
        .await?;
    Ok(Reply::done("Logged out"))
}

pub async fn check(Caller(ctx): Caller) -> ApiResult<StaffContext> {
    Ok(Reply::ok("Authenticated", ctx))
}

pub async fn profile(State(state): State<AppState>, Caller(ctx): Caller) -> ApiResult<Staff> {
    let staff = state
        .run(move |db| {
            db.find_staff_by_id(ctx.staff_id)?
                .ok_or_else(|| Error::not_found("Staff", ctx.staff_id))
        })
        .await?;
    Ok(Reply::ok("Profile", staff))
}

pub async fn change_password(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Value> {
    let policy = state.policy;
    state
        .run(move |db| {
            AuthService::new(db, policy).change_password(
                &ctx,
                &req.current_password,
                &req.new_password,
            )
        })
        .await?;
    Ok(Reply::done("Password changed"))
}

pub async fn register(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiJson(req): ApiJson<RegisterStaffRequest>,
) -> ApiResult<Staff> {
    let policy = state.policy;
    let staff = state
        .run(move |db| {
            AuthService::new(db, policy).register_staff(
                &ctx,
                NewStaff {
                    username: req.username,
                    email: req.email,
                    password: req.password,
                    first_name: req.first_name,
                    last_name: req.last_name,
                    role: req.role,
                },
            )
        })
        .await?;
    Ok(Reply::created("Staff account created", staff))
}
