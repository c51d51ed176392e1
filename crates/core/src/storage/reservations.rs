//! Reservation storage operations

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    classify, format_date, parse_date, parse_datetime, parse_enum, parse_uuid, OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{
    PaymentStatus, Reservation, ReservationDetails, ReservationFilter, ReservationStatus, StayDates,
};

const RESERVATION_COLUMNS: &str = "r.id, r.reservation_code, r.guest_id, r.room_id, \
     r.check_in_date, r.check_out_date, r.adults, r.children, r.total_amount, r.special_requests, \
     r.status, r.payment_status, r.cancellation_reason, r.created_at, r.updated_at";

const DETAIL_JOIN: &str = "FROM reservations r
     JOIN guests g ON g.id = r.guest_id
     JOIN rooms rm ON rm.id = r.room_id";

fn row_to_reservation(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        reservation_code: row.get(1)?,
        guest_id: parse_uuid(&row.get::<_, String>(2)?)?,
        room_id: parse_uuid(&row.get::<_, String>(3)?)?,
        stay: StayDates {
            check_in: parse_date(&row.get::<_, String>(4)?)?,
            check_out: parse_date(&row.get::<_, String>(5)?)?,
        },
        adults: row.get(6)?,
        children: row.get(7)?,
        total_amount: row.get(8)?,
        special_requests: row.get(9)?,
        status: parse_enum(
            &row.get::<_, String>(10)?,
            "reservation status",
            ReservationStatus::parse,
        )?,
        payment_status: parse_enum(
            &row.get::<_, String>(11)?,
            "payment status",
            PaymentStatus::parse,
        )?,
        cancellation_reason: row.get(12)?,
        created_at: parse_datetime(&row.get::<_, String>(13)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(14)?)?,
    })
}

fn row_to_details(row: &Row<'_>) -> rusqlite::Result<ReservationDetails> {
    let reservation = row_to_reservation(row)?;
    let first: String = row.get(15)?;
    let last: String = row.get(16)?;
    Ok(ReservationDetails {
        nights: reservation.nights(),
        reservation,
        guest_name: format!("{first} {last}"),
        guest_email: row.get(17)?,
        room_number: row.get(18)?,
    })
}

pub struct ReservationStore<'a> {
    conn: &'a Connection,
}

impl<'a> ReservationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a reservation row as-is.
    ///
    /// Overlapping active rows are rejected by the schema triggers.
    #[instrument(skip(self, reservation), fields(reservation_id = %reservation.id, room_id = %reservation.room_id))]
    pub fn insert(&self, reservation: &Reservation) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO reservations (id, reservation_code, guest_id, room_id, check_in_date, check_out_date,
                    adults, children, total_amount, special_requests, status, payment_status,
                    cancellation_reason, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    reservation.id.to_string(),
                    reservation.reservation_code,
                    reservation.guest_id.to_string(),
                    reservation.room_id.to_string(),
                    format_date(reservation.stay.check_in),
                    format_date(reservation.stay.check_out),
                    reservation.adults,
                    reservation.children,
                    reservation.total_amount,
                    reservation.special_requests,
                    reservation.status.as_str(),
                    reservation.payment_status.as_str(),
                    reservation.cancellation_reason,
                    reservation.created_at.to_rfc3339(),
                    reservation.updated_at.to_rfc3339(),
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations r WHERE r.id = ?1");
        let reservation = self
            .conn
            .query_row(&sql, params![id.to_string()], row_to_reservation)
            .optional()?;
        Ok(reservation)
    }

    pub fn get(&self, id: Uuid) -> Result<Reservation> {
        self.find_by_id(id)?
            .ok_or_else(|| Error::not_found("Reservation", id))
    }

    /// Reservation with guest and room display fields
    #[instrument(skip(self))]
    pub fn find_details(&self, id: Uuid) -> Result<Option<ReservationDetails>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS}, g.first_name, g.last_name, g.email, rm.room_number
             {DETAIL_JOIN} WHERE r.id = ?1"
        );
        let details = self
            .conn
            .query_row(&sql, params![id.to_string()], row_to_details)
            .optional()?;
        Ok(details)
    }

    #[instrument(skip(self))]
    pub fn find_by_code(&self, code: &str) -> Result<Option<ReservationDetails>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS}, g.first_name, g.last_name, g.email, rm.room_number
             {DETAIL_JOIN} WHERE r.reservation_code = ?1"
        );
        let details = self
            .conn
            .query_row(&sql, params![code.trim().to_uppercase()], row_to_details)
            .optional()?;
        Ok(details)
    }

    /// List reservations matching the filter, newest stays first
    #[instrument(skip(self, filter))]
    pub fn list(&self, filter: &ReservationFilter) -> Result<Vec<ReservationDetails>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let sql = format!(
            "SELECT {RESERVATION_COLUMNS}, g.first_name, g.last_name, g.email, rm.room_number
             {DETAIL_JOIN}
             WHERE (?1 IS NULL OR r.status = ?1)
               AND (?2 IS NULL OR r.room_id = ?2)
               AND (?3 IS NULL OR r.guest_id = ?3)
               AND (?4 IS NULL OR r.check_in_date >= ?4)
               AND (?5 IS NULL OR r.check_out_date <= ?5)
               AND (?6 IS NULL OR r.reservation_code LIKE ?6
                    OR (g.first_name || ' ' || g.last_name) LIKE ?6
                    OR g.email LIKE ?6 OR rm.room_number LIKE ?6)
             ORDER BY r.check_in_date DESC, r.created_at DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    filter.status.map(|s| s.as_str()),
                    filter.room_id.map(|id| id.to_string()),
                    filter.guest_id.map(|id| id.to_string()),
                    filter.check_in_from.map(format_date),
                    filter.check_out_to.map(format_date),
                    search,
                ],
                row_to_details,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Active reservations holding the given room, ordered by check-in
    pub fn list_active_for_room(&self, room_id: Uuid) -> Result<Vec<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations r
             WHERE r.room_id = ?1 AND r.status IN ('confirmed', 'checked_in')
             ORDER BY r.check_in_date"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![room_id.to_string()], row_to_reservation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Whether an active reservation other than `exclude` shares a night with `stay`
    #[instrument(skip(self))]
    pub fn has_conflict(
        &self,
        room_id: Uuid,
        stay: &StayDates,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        let conflicts: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reservations
             WHERE room_id = ?1
               AND status IN ('confirmed', 'checked_in')
               AND check_in_date < ?3
               AND check_out_date > ?2
               AND (?4 IS NULL OR id != ?4)",
            params![
                room_id.to_string(),
                format_date(stay.check_in),
                format_date(stay.check_out),
                exclude.map(|id| id.to_string()),
            ],
            |row| row.get(0),
        )?;
        Ok(conflicts > 0)
    }

    /// Overwrite every mutable column
    #[instrument(skip(self, reservation), fields(reservation_id = %reservation.id))]
    pub fn update(&self, reservation: &Reservation) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE reservations SET guest_id = ?1, room_id = ?2, check_in_date = ?3, check_out_date = ?4,
                    adults = ?5, children = ?6, total_amount = ?7, special_requests = ?8, status = ?9,
                    payment_status = ?10, cancellation_reason = ?11, updated_at = ?12
                 WHERE id = ?13",
                params![
                    reservation.guest_id.to_string(),
                    reservation.room_id.to_string(),
                    format_date(reservation.stay.check_in),
                    format_date(reservation.stay.check_out),
                    reservation.adults,
                    reservation.children,
                    reservation.total_amount,
                    reservation.special_requests,
                    reservation.status.as_str(),
                    reservation.payment_status.as_str(),
                    reservation.cancellation_reason,
                    reservation.updated_at.to_rfc3339(),
                    reservation.id.to_string(),
                ],
            )
            .map_err(classify)?;

        if changed == 0 {
            return Err(Error::not_found("Reservation", reservation.id));
        }
        Ok(())
    }

    pub fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE reservations SET payment_status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM reservations WHERE id = ?1",
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::not_found("Reservation", id));
        }
        Ok(())
    }

    /// Confirmed stays starting on `date`
    pub fn arrivals(&self, date: NaiveDate) -> Result<Vec<ReservationDetails>> {
        self.list(&ReservationFilter {
            status: Some(ReservationStatus::Confirmed),
            check_in_from: Some(date),
            ..Default::default()
        })
        .map(|rows| {
            rows.into_iter()
                .filter(|d| d.reservation.stay.check_in == date)
                .collect()
        })
    }

    /// Checked-in stays ending on `date`
    pub fn departures(&self, date: NaiveDate) -> Result<Vec<ReservationDetails>> {
        self.list(&ReservationFilter {
            status: Some(ReservationStatus::CheckedIn),
            check_out_to: Some(date),
            ..Default::default()
        })
        .map(|rows| {
            rows.into_iter()
                .filter(|d| d.reservation.stay.check_out == date)
                .collect()
        })
    }

    pub fn count_by_status(&self, status: ReservationStatus) -> Result<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM reservations WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
