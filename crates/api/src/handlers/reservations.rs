use axum::extract::State;
use innkeep_core::{
    BookingEngine, Error, GuestChoice, NewReservation, PermissionMatrix, Reservation,
    ReservationDetails, ReservationFilter, ReservationStatus, ReservationUpdate, StaffAction,
    StayDates,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::ApiResult;
use crate::dto::{
    AvailabilityQuery, DayQuery, ReasonRequest, ReservationInput, ReservationPatch,
    ReservationStatusRequest,
};
use crate::envelope::Reply;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Caller};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiQuery(filter): ApiQuery<ReservationFilter>,
) -> ApiResult<Vec<ReservationDetails>> {
    PermissionMatrix::require(&ctx, StaffAction::ViewReservations)?;
    let list = state.run(move |db| db.reservations().list(&filter)).await?;
    Ok(Reply::ok("Reservations", list))
}

/// Book a room for an existing guest or an inline one
pub async fn create(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiJson(input): ApiJson<ReservationInput>,
) -> ApiResult<Reservation> {
    PermissionMatrix::require(&ctx, StaffAction::ManageReservations)?;
    let reservation = state
        .run(move |db| {
            let guest = match (input.guest_id, input.guest) {
                (Some(id), _) => GuestChoice::Existing(id),
                (None, Some(guest)) => GuestChoice::New(guest.into_guest()?),
                (None, None) => return Err(Error::validation("guest_id or guest is required")),
            };
            let stay = StayDates::new(input.check_in_date, input.check_out_date)?;
            BookingEngine::new(db).create_reservation(NewReservation {
                guest,
                room_id: input.room_id,
                stay,
                adults: input.adults.unwrap_or(1),
                children: input.children.unwrap_or(0),
                total_amount: input.total_amount,
                special_requests: input.special_requests,
                status: input.status.unwrap_or(ReservationStatus::Confirmed),
            })
        })
        .await?;
    Ok(Reply::created("Reservation created", reservation))
}

pub async fn availability(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiQuery(q): ApiQuery<AvailabilityQuery>,
) -> ApiResult<Value> {
    PermissionMatrix::require(&ctx, StaffAction::ViewReservations)?;
    let available = state
        .run(move |db| {
            BookingEngine::new(db).check_availability(q.room_id, q.check_in, q.check_out, q.exclude)
        })
        .await?;
    Ok(Reply::ok(
        if available { "Room is available" } else { "Room is not available" },
        json!({ "available": available }),
    ))
}

pub async fn arrivals(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiQuery(q): ApiQuery<DayQuery>,
) -> ApiResult<Vec<ReservationDetails>> {
    PermissionMatrix::require(&ctx, StaffAction::ViewReservations)?;
    let day = q.day();
    let list = state.run(move |db| db.reservations().arrivals(day)).await?;
    Ok(Reply::ok("Arrivals", list))
}

pub async fn departures(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiQuery(q): ApiQuery<DayQuery>,
) -> ApiResult<Vec<ReservationDetails>> {
    PermissionMatrix::require(&ctx, StaffAction::ViewReservations)?;
    let day = q.day();
    let list = state.run(move |db| db.reservations().departures(day)).await?;
    Ok(Reply::ok("Departures", list))
}

pub async fn by_code(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(code): ApiPath<String>,
) -> ApiResult<ReservationDetails> {
    PermissionMatrix::require(&ctx, StaffAction::ViewReservations)?;
    let found = state
        .run(move |db| {
            db.reservations()
                .find_by_code(&code)?
                .ok_or_else(|| Error::not_found("Reservation", &code))
        })
        .await?;
    Ok(Reply::ok("Reservation", found))
}

pub async fn get(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ReservationDetails> {
    PermissionMatrix::require(&ctx, StaffAction::ViewReservations)?;
    let found = state
        .run(move |db| {
            db.reservations()
                .find_details(id)?
                .ok_or_else(|| Error::not_found("Reservation", id))
        })
        .await?;
    Ok(Reply::ok("Reservation", found))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<ReservationPatch>,
) -> ApiResult<Reservation> {
    PermissionMatrix::require(&ctx, StaffAction::ManageReservations)?;
    let update = ReservationUpdate {
        room_id: patch.room_id,
        check_in: patch.check_in_date,
        check_out: patch.check_out_date,
        adults: patch.adults,
        children: patch.children,
        total_amount: patch.total_amount,
        special_requests: patch.special_requests,
    };
    let reservation = state
        .run(move |db| BookingEngine::new(db).update_reservation(id, update))
        .await?;
    Ok(Reply::ok("Reservation updated", reservation))
}

pub async fn delete(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    PermissionMatrix::require(&ctx, StaffAction::DeleteReservations)?;
    state
        .run(move |db| BookingEngine::new(db).delete_reservation(id))
        .await?;
    Ok(Reply::done("Reservation deleted"))
}

pub async fn set_status(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ReservationStatusRequest>,
) -> ApiResult<Reservation> {
    PermissionMatrix::require(&ctx, StaffAction::ManageReservations)?;
    let reservation = state
        .run(move |db| BookingEngine::new(db).transition(id, req.status, req.reason))
        .await?;
    Ok(Reply::ok(
        format!("Reservation is now {}", reservation.status),
        reservation,
    ))
}

pub async fn cancel(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<ReasonRequest>>,
) -> ApiResult<Reservation> {
    PermissionMatrix::require(&ctx, StaffAction::ManageReservations)?;
    let reason = body.and_then(|ApiJson(req)| req.reason);
    let reservation = state
        .run(move |db| BookingEngine::new(db).cancel(id, reason))
        .await?;
    Ok(Reply::ok("Reservation cancelled", reservation))
}
