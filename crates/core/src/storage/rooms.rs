//! Room storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::{info, instrument};
use uuid::Uuid;

use super::parse::{
    aborted_with, classify, format_date, parse_datetime, parse_datetime_opt, parse_enum, parse_string_list, parse_uuid,
    OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{Room, RoomFilter, RoomStatus, RoomType, StayDates};

const ROOM_COLUMNS: &str = "id, room_number, room_type, floor, capacity, price_per_night, status, \
     amenities, description, last_cleaned, created_at, updated_at";

fn row_to_room(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        room_number: row.get(1)?,
        room_type: parse_enum(&row.get::<_, String>(2)?, "room type", RoomType::parse)?,
        floor: row.get(3)?,
        capacity: row.get(4)?,
        price_per_night: row.get(5)?,
        status: parse_enum(&row.get::<_, String>(6)?, "room status", RoomStatus::parse)?,
        amenities: parse_string_list(&row.get::<_, String>(7)?)?,
        description: row.get(8)?,
        last_cleaned: parse_datetime_opt(row.get(9)?)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(11)?)?,
    })
}

pub struct RoomStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoomStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new room
    #[instrument(skip(self, room), fields(room_number = %room.room_number))]
    pub fn create(&self, room: &Room) -> Result<()> {
        room.validate()?;
        if self.number_taken(&room.room_number, None)? {
            return Err(Error::Duplicate(format!(
                "Room number {} already exists",
                room.room_number
            )));
        }

        self.conn
            .execute(
                "INSERT INTO rooms (id, room_number, room_type, floor, capacity, price_per_night, status, amenities, description, last_cleaned, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    room.id.to_string(),
                    room.room_number,
                    room.room_type.as_str(),
                    room.floor,
                    room.capacity,
                    room.price_per_night,
                    room.status.as_str(),
                    serde_json::to_string(&room.amenities)?,
                    room.description,
                    room.last_cleaned.map(|t| t.to_rfc3339()),
                    room.created_at.to_rfc3339(),
                    room.updated_at.to_rfc3339(),
                ],
            )
            .map_err(classify)?;

        info!(room_id = %room.id, "Room created");
        Ok(())
    }

    /// Find room by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Room>> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?1");
        let room = self
            .conn
            .query_row(&sql, params![id.to_string()], row_to_room)
            .optional()?;
        Ok(room)
    }

    /// Find room by ID or fail with `NotFound`
    pub fn get(&self, id: Uuid) -> Result<Room> {
        self.find_by_id(id)?
            .ok_or_else(|| Error::not_found("Room", id))
    }

    #[instrument(skip(self))]
    pub fn find_by_number(&self, room_number: &str) -> Result<Option<Room>> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE room_number = ?1");
        let room = self
            .conn
            .query_row(&sql, params![room_number], row_to_room)
            .optional()?;
        Ok(room)
    }

    /// List rooms matching the filter, ordered by room number
    #[instrument(skip(self, filter))]
    pub fn list(&self, filter: &RoomFilter) -> Result<Vec<Room>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let sql = format!(
            "SELECT {ROOM_COLUMNS} FROM rooms
             WHERE (?1 IS NULL OR room_type = ?1)
               AND (?2 IS NULL OR status = ?2)
               AND (?3 IS NULL OR floor = ?3)
               AND (?4 IS NULL OR capacity >= ?4)
               AND (?5 IS NULL OR room_number LIKE ?5 OR description LIKE ?5)
             ORDER BY room_number"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rooms = stmt
            .query_map(
                params![
                    filter.room_type.map(|t| t.as_str()),
                    filter.status.map(|s| s.as_str()),
                    filter.floor,
                    filter.min_capacity,
                    search,
                ],
                row_to_room,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rooms)
    }

    /// Sellable rooms with no active reservation sharing a night with `stay`
    #[instrument(skip(self))]
    pub fn list_available(
        &self,
        stay: &StayDates,
        room_type: Option<RoomType>,
        min_capacity: Option<u32>,
    ) -> Result<Vec<Room>> {
        let sql = format!(
            "SELECT {ROOM_COLUMNS} FROM rooms rm
             WHERE rm.status NOT IN ('maintenance', 'out-of-order')
               AND (?3 IS NULL OR rm.room_type = ?3)
               AND (?4 IS NULL OR rm.capacity >= ?4)
               AND NOT EXISTS (
                   SELECT 1 FROM reservations r
                   WHERE r.room_id = rm.id
                     AND r.status IN ('confirmed', 'checked_in')
                     AND r.check_in_date < ?2
                     AND r.check_out_date > ?1
               )
             ORDER BY rm.room_type, rm.room_number"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rooms = stmt
            .query_map(
                params![
                    format_date(stay.check_in),
                    format_date(stay.check_out),
                    room_type.map(|t| t.as_str()),
                    min_capacity,
                ],
                row_to_room,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rooms)
    }

    /// Overwrite editable fields of a room
    #[instrument(skip(self, room), fields(room_id = %room.id))]
    pub fn update(&self, room: &Room) -> Result<()> {
        room.validate()?;
        if self.number_taken(&room.room_number, Some(room.id))? {
            return Err(Error::Duplicate(format!(
                "Room number {} already exists",
                room.room_number
            )));
        }

        let changed = self
            .conn
            .execute(
                "UPDATE rooms SET room_number = ?1, room_type = ?2, floor = ?3, capacity = ?4,
                    price_per_night = ?5, status = ?6, amenities = ?7, description = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    room.room_number,
                    room.room_type.as_str(),
                    room.floor,
                    room.capacity,
                    room.price_per_night,
                    room.status.as_str(),
                    serde_json::to_string(&room.amenities)?,
                    room.description,
                    Utc::now().to_rfc3339(),
                    room.id.to_string(),
                ],
            )
            .map_err(classify)?;

        if changed == 0 {
            return Err(Error::not_found("Room", room.id));
        }
        Ok(())
    }

    /// Set the housekeeping status
    #[instrument(skip(self))]
    pub fn update_status(&self, id: Uuid, status: RoomStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE rooms SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), Utc::now().to_rfc3339(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::not_found("Room", id));
        }
        info!(room_id = %id, status = status.as_str(), "Room status updated");
        Ok(())
    }

    /// Stamp `last_cleaned`; a room waiting in `cleaning` becomes `available`
    #[instrument(skip(self))]
    pub fn mark_cleaned(&self, id: Uuid) -> Result<Room> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE rooms SET last_cleaned = ?1, updated_at = ?1,
                status = CASE WHEN status = 'cleaning' THEN 'available' ELSE status END
             WHERE id = ?2",
            params![now, id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::not_found("Room", id));
        }
        self.get(id)
    }

    /// Delete a room that holds no active reservations
    #[instrument(skip(self))]
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM rooms WHERE id = ?1", params![id.to_string()])
            .map_err(|e| {
                if aborted_with(&e, "room_has_active_reservations") {
                    Error::validation("Cannot delete room with active reservations")
                } else {
                    Error::from(e)
                }
            })?;
        if changed == 0 {
            return Err(Error::not_found("Room", id));
        }
        info!(room_id = %id, "Room deleted");
        Ok(())
    }

    /// Room counts per status, zero-filled
    pub fn count_by_status(&self) -> Result<Vec<(RoomStatus, u32)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM rooms GROUP BY status")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    parse_enum(&row.get::<_, String>(0)?, "room status", RoomStatus::parse)?,
                    row.get::<_, u32>(1)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(RoomStatus::all()
            .iter()
            .map(|status| {
                let count = rows
                    .iter()
                    .find(|(s, _)| s == status)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                (*status, count)
            })
            .collect())
    }

    fn number_taken(&self, room_number: &str, exclude: Option<Uuid>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM rooms WHERE room_number = ?1 AND (?2 IS NULL OR id != ?2)",
            params![room_number, exclude.map(|id| id.to_string())],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
