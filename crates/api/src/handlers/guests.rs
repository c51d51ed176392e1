use axum::extract::State;
use innkeep_core::{
    Error, Guest, GuestRepository, GuestSummary, PermissionMatrix, ReservationDetails,
    ReservationFilter, StaffAction,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::ApiResult;
use crate::dto::{GuestInput, LoyaltyAction, LoyaltyRequest, SearchQuery};
use crate::envelope::Reply;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Caller};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiQuery(q): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<Guest>> {
    PermissionMatrix::require(&ctx, StaffAction::ViewGuests)?;
    let guests = state
        .run(move |db| db.list_guests(q.search.as_deref()))
        .await?;
    Ok(Reply::ok("Guests", guests))
}

pub async fn get(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Guest> {
    PermissionMatrix::require(&ctx, StaffAction::ViewGuests)?;
    let guest = state
        .run(move |db| db.find_guest_by_id(id)?.ok_or_else(|| Error::not_found("Guest", id)))
        .await?;
    Ok(Reply::ok("Guest", guest))
}

pub async fn create(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiJson(input): ApiJson<GuestInput>,
) -> ApiResult<Guest> {
    PermissionMatrix::require(&ctx, StaffAction::ManageGuests)?;
    let guest = state
        .run(move |db| {
            let guest = input.into_guest()?;
            db.create_guest(&guest)?;
            db.guests().get(guest.id)
        })
        .await?;
    Ok(Reply::created("Guest created", guest))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<GuestInput>,
) -> ApiResult<Guest> {
    PermissionMatrix::require(&ctx, StaffAction::ManageGuests)?;
    let guest = state
        .run(move |db| {
            let mut guest = db.guests().get(id)?;
            input.apply(&mut guest);
            db.update_guest(&guest)?;
            db.guests().get(id)
        })
        .await?;
    Ok(Reply::ok("Guest updated", guest))
}

pub async fn delete(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    PermissionMatrix::require(&ctx, StaffAction::DeleteGuests)?;
    state.run(move |db| db.delete_guest(id)).await?;
    Ok(Reply::done("Guest deleted"))
}

/// Stay history, newest first
pub async fn reservations(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Vec<ReservationDetails>> {
    PermissionMatrix::require(&ctx, StaffAction::ViewGuests)?;
    let history = state
        .run(move |db| {
            db.guests().get(id)?;
            db.reservations().list(&ReservationFilter {
                guest_id: Some(id),
                ..Default::default()
            })
        })
        .await?;
    Ok(Reply::ok("Guest reservations", history))
}

pub async fn summary(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<GuestSummary> {
    PermissionMatrix::require(&ctx, StaffAction::ViewGuests)?;
    let summary = state.run(move |db| db.guests().summary(id)).await?;
    Ok(Reply::ok("Guest summary", summary))
}

pub async fn loyalty(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<LoyaltyRequest>,
) -> ApiResult<Value> {
    PermissionMatrix::require(&ctx, StaffAction::ManageGuests)?;
    if req.points == 0 {
        return Err(Error::validation("Points must be greater than zero").into());
    }
    let balance = state
        .run(move |db| match req.action {
            LoyaltyAction::Add => db.guests().add_loyalty_points(id, req.points),
            LoyaltyAction::Deduct => db.guests().deduct_loyalty_points(id, req.points),
        })
        .await?;
    Ok(Reply::ok(
        "Loyalty points updated",
        json!({ "guest_id": id, "loyalty_points": balance }),
    ))
}
