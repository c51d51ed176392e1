//! Guest storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::{info, instrument};
use uuid::Uuid;

use super::parse::{
    aborted_with, classify, format_date, parse_date_opt, parse_datetime, parse_enum, parse_uuid,
    OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{normalize_email, Guest, GuestSummary, IdType};

const GUEST_COLUMNS: &str = "id, first_name, last_name, email, phone, id_type, id_number, \
     nationality, date_of_birth, address, city, loyalty_points, is_vip, created_at, updated_at";

fn row_to_guest(row: &Row<'_>) -> rusqlite::Result<Guest> {
    Ok(Guest {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        id_type: parse_enum(&row.get::<_, String>(5)?, "id type", IdType::parse)?,
        id_number: row.get(6)?,
        nationality: row.get(7)?,
        date_of_birth: parse_date_opt(row.get(8)?)?,
        address: row.get(9)?,
        city: row.get(10)?,
        loyalty_points: row.get(11)?,
        is_vip: row.get(12)?,
        created_at: parse_datetime(&row.get::<_, String>(13)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(14)?)?,
    })
}

pub struct GuestStore<'a> {
    conn: &'a Connection,
}

impl<'a> GuestStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new guest
    #[instrument(skip(self, guest), fields(guest_id = %guest.id))]
    pub fn create(&self, guest: &Guest) -> Result<()> {
        guest.validate()?;
        self.ensure_unique(guest, None)?;

        self.conn
            .execute(
                "INSERT INTO guests (id, first_name, last_name, email, phone, id_type, id_number, nationality,
                    date_of_birth, address, city, loyalty_points, is_vip, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    guest.id.to_string(),
                    guest.first_name.trim(),
                    guest.last_name.trim(),
                    normalize_email(&guest.email),
                    guest.phone,
                    guest.id_type.as_str(),
                    guest.id_number,
                    guest.nationality,
                    guest.date_of_birth.map(format_date),
                    guest.address,
                    guest.city,
                    guest.loyalty_points,
                    guest.is_vip,
                    guest.created_at.to_rfc3339(),
                    guest.updated_at.to_rfc3339(),
                ],
            )
            .map_err(classify)?;

        info!("Guest created");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Guest>> {
        let sql = format!("SELECT {GUEST_COLUMNS} FROM guests WHERE id = ?1");
        let guest = self
            .conn
            .query_row(&sql, params![id.to_string()], row_to_guest)
            .optional()?;
        Ok(guest)
    }

    pub fn get(&self, id: Uuid) -> Result<Guest> {
        self.find_by_id(id)?
            .ok_or_else(|| Error::not_found("Guest", id))
    }

    /// Lookup by email; the input is normalized first
    #[instrument(skip(self))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<Guest>> {
        let sql = format!("SELECT {GUEST_COLUMNS} FROM guests WHERE email = ?1");
        let guest = self
            .conn
            .query_row(&sql, params![normalize_email(email)], row_to_guest)
            .optional()?;
        Ok(guest)
    }

    /// List guests, optionally matching name, email or phone
    #[instrument(skip(self))]
    pub fn list(&self, search: Option<&str>) -> Result<Vec<Guest>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let sql = format!(
            "SELECT {GUEST_COLUMNS} FROM guests
             WHERE ?1 IS NULL
                OR first_name LIKE ?1 OR last_name LIKE ?1
                OR (first_name || ' ' || last_name) LIKE ?1
                OR email LIKE ?1 OR phone LIKE ?1
             ORDER BY last_name, first_name"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let guests = stmt
            .query_map(params![pattern], row_to_guest)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(guests)
    }

    /// Overwrite editable fields of a guest
    #[instrument(skip(self, guest), fields(guest_id = %guest.id))]
    pub fn update(&self, guest: &Guest) -> Result<()> {
        guest.validate()?;
        self.ensure_unique(guest, Some(guest.id))?;

        let changed = self
            .conn
            .execute(
                "UPDATE guests SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4, id_type = ?5,
                    id_number = ?6, nationality = ?7, date_of_birth = ?8, address = ?9, city = ?10,
                    is_vip = ?11, updated_at = ?12
                 WHERE id = ?13",
                params![
                    guest.first_name.trim(),
                    guest.last_name.trim(),
                    normalize_email(&guest.email),
                    guest.phone,
                    guest.id_type.as_str(),
                    guest.id_number,
                    guest.nationality,
                    guest.date_of_birth.map(format_date),
                    guest.address,
                    guest.city,
                    guest.is_vip,
                    Utc::now().to_rfc3339(),
                    guest.id.to_string(),
                ],
            )
            .map_err(classify)?;

        if changed == 0 {
            return Err(Error::not_found("Guest", guest.id));
        }
        Ok(())
    }

    /// Delete a guest that holds no active reservations
    #[instrument(skip(self))]
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM guests WHERE id = ?1", params![id.to_string()])
            .map_err(|e| {
                if aborted_with(&e, "guest_has_active_reservations") {
                    Error::validation("Cannot delete guest with active reservations")
                } else {
                    Error::from(e)
                }
            })?;
        if changed == 0 {
            return Err(Error::not_found("Guest", id));
        }
        info!(guest_id = %id, "Guest deleted");
        Ok(())
    }

    /// Add loyalty points, returning the new balance
    #[instrument(skip(self))]
    pub fn add_loyalty_points(&self, id: Uuid, points: u32) -> Result<u32> {
        let changed = self.conn.execute(
            "UPDATE guests SET loyalty_points = loyalty_points + ?1, updated_at = ?2 WHERE id = ?3",
            params![points, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::not_found("Guest", id));
        }
        Ok(self.get(id)?.loyalty_points)
    }

    /// Deduct loyalty points, returning the new balance
    #[instrument(skip(self))]
    pub fn deduct_loyalty_points(&self, id: Uuid, points: u32) -> Result<u32> {
        let changed = self.conn.execute(
            "UPDATE guests SET loyalty_points = loyalty_points - ?1, updated_at = ?2
             WHERE id = ?3 AND loyalty_points >= ?1",
            params![points, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        if changed == 0 {
            // Either the guest is missing or the balance is too small
            self.get(id)?;
            return Err(Error::validation("Insufficient loyalty points"));
        }
        Ok(self.get(id)?.loyalty_points)
    }

    /// Stay totals for one guest
    #[instrument(skip(self))]
    pub fn summary(&self, id: Uuid) -> Result<GuestSummary> {
        self.get(id)?;
        let summary = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'checked_out' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'checked_out' THEN total_amount ELSE 0 END), 0),
                    MIN(check_in_date),
                    MAX(check_in_date)
             FROM reservations WHERE guest_id = ?1",
            params![id.to_string()],
            |row| {
                Ok(GuestSummary {
                    total_bookings: row.get(0)?,
                    completed_bookings: row.get(1)?,
                    cancelled_bookings: row.get(2)?,
                    total_spent: row.get(3)?,
                    first_visit: parse_date_opt(row.get(4)?)?,
                    last_visit: parse_date_opt(row.get(5)?)?,
                })
            },
        )?;
        Ok(summary)
    }

    fn ensure_unique(&self, guest: &Guest, exclude: Option<Uuid>) -> Result<()> {
        let exclude = exclude.map(|id| id.to_string());
        let checks = [
            ("email", Some(normalize_email(&guest.email))),
            ("phone", guest.phone.clone()),
            ("id_number", guest.id_number.clone()),
        ];

        for (column, value) in checks {
            let Some(value) = value else { continue };
            let sql = format!(
                "SELECT COUNT(*) FROM guests WHERE {column} = ?1 AND (?2 IS NULL OR id != ?2)"
            );
            let count: i64 =
                self.conn
                    .query_row(&sql, params![value, exclude], |row| row.get(0))?;
            if count > 0 {
                return Err(Error::Duplicate(format!(
                    "A guest with this {} already exists",
                    column.replace('_', " ")
                )));
            }
        }
        Ok(())
    }
}
