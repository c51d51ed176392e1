use axum::extract::State;
use innkeep_core::{
    BookingEngine, Error, PermissionMatrix, Room, RoomFilter, RoomRepository, StaffAction,
};
use serde_json::Value;
use uuid::Uuid;

use super::ApiResult;
use crate::dto::{AvailableRoomsQuery, RoomInput, RoomStatusRequest};
use crate::envelope::Reply;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Caller};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiQuery(filter): ApiQuery<RoomFilter>,
) -> ApiResult<Vec<Room>> {
    PermissionMatrix::require(&ctx, StaffAction::ViewRooms)?;
    let rooms = state.run(move |db| db.list_rooms(&filter)).await?;
    Ok(Reply::ok("Rooms", rooms))
}

/// Rooms free for a whole stay
pub async fn available(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiQuery(q): ApiQuery<AvailableRoomsQuery>,
) -> ApiResult<Vec<Room>> {
    PermissionMatrix::require(&ctx, StaffAction::ViewRooms)?;
    let rooms = state
        .run(move |db| {
            BookingEngine::new(db).available_rooms(q.check_in, q.check_out, q.room_type, q.capacity)
        })
        .await?;
    Ok(Reply::ok("Available rooms", rooms))
}

pub async fn get(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Room> {
    PermissionMatrix::require(&ctx, StaffAction::ViewRooms)?;
    let room = state
        .run(move |db| db.find_room_by_id(id)?.ok_or_else(|| Error::not_found("Room", id)))
        .await?;
    Ok(Reply::ok("Room", room))
}

pub async fn create(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiJson(input): ApiJson<RoomInput>,
) -> ApiResult<Room> {
    PermissionMatrix::require(&ctx, StaffAction::ManageRooms)?;
    let room = state
        .run(move |db| {
            let room = input.into_room()?;
            db.create_room(&room)?;
            Ok(room)
        })
        .await?;
    Ok(Reply::created("Room created", room))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<RoomInput>,
) -> ApiResult<Room> {
    PermissionMatrix::require(&ctx, StaffAction::ManageRooms)?;
    let room = state
        .run(move |db| {
            let mut room = db.rooms().get(id)?;
            input.apply(&mut room);
            db.update_room(&room)?;
            db.rooms().get(id)
        })
        .await?;
    Ok(Reply::ok("Room updated", room))
}

pub async fn delete(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    PermissionMatrix::require(&ctx, StaffAction::DeleteRooms)?;
    state.run(move |db| db.delete_room(id)).await?;
    Ok(Reply::done("Room deleted"))
}

pub async fn set_status(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RoomStatusRequest>,
) -> ApiResult<Room> {
    PermissionMatrix::require(&ctx, StaffAction::UpdateRoomStatus)?;
    let room = state
        .run(move |db| {
            db.rooms().update_status(id, req.status)?;
            db.rooms().get(id)
        })
        .await?;
    Ok(Reply::ok("Room status updated", room))
}

pub async fn mark_cleaned(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Room> {
    PermissionMatrix::require(&ctx, StaffAction::UpdateRoomStatus)?;
    let room = state.run(move |db| db.rooms().mark_cleaned(id)).await?;
    Ok(Reply::ok("Room marked as cleaned", room))
}
