//! Staff account and session storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{classify, parse_datetime, parse_datetime_opt, parse_enum, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{Session, Staff, StaffRole};

const STAFF_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, role, \
     is_active, login_attempts, last_login, created_at";

fn row_to_staff(row: &Row<'_>) -> rusqlite::Result<Staff> {
    Ok(Staff {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        role: parse_enum(&row.get::<_, String>(6)?, "staff role", StaffRole::parse)?,
        is_active: row.get(7)?,
        login_attempts: row.get(8)?,
        last_login: parse_datetime_opt(row.get(9)?)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?)?,
    })
}

pub struct StaffStore<'a> {
    conn: &'a Connection,
}

impl<'a> StaffStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new staff account
    #[instrument(skip(self, staff), fields(username = %staff.username))]
    pub fn create(&self, staff: &Staff) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO staff (id, username, email, password_hash, first_name, last_name, role,
                    is_active, login_attempts, last_login, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    staff.id.to_string(),
                    staff.username,
                    staff.email,
                    staff.password_hash,
                    staff.first_name,
                    staff.last_name,
                    staff.role.as_str(),
                    staff.is_active,
                    staff.login_attempts,
                    staff.last_login.map(|t| t.to_rfc3339()),
                    staff.created_at.to_rfc3339(),
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    /// Find staff by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Staff>> {
        let sql = format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?1");
        let staff = self
            .conn
            .query_row(&sql, params![id.to_string()], row_to_staff)
            .optional()?;
        Ok(staff)
    }

    /// Find staff by username
    #[instrument(skip(self))]
    pub fn find_by_username(&self, username: &str) -> Result<Option<Staff>> {
        let sql = format!("SELECT {STAFF_COLUMNS} FROM staff WHERE username = ?1");
        let staff = self
            .conn
            .query_row(&sql, params![username], row_to_staff)
            .optional()?;
        Ok(staff)
    }

    pub fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM staff WHERE username = ?1 OR email = ?2",
            params![username, email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count(&self) -> Result<u32> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM staff", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Bump the failed-login counter, returning the new value
    pub fn record_failed_login(&self, staff_id: Uuid) -> Result<u32> {
        let attempts = self.conn.query_row(
            "UPDATE staff SET login_attempts = login_attempts + 1 WHERE id = ?1
             RETURNING login_attempts",
            params![staff_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(attempts)
    }

    /// Reset the failed-login counter and stamp last login
    pub fn record_successful_login(&self, staff_id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE staff SET login_attempts = 0, last_login = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), staff_id.to_string()],
        )?;
        Ok(())
    }

    pub fn update_password(&self, staff_id: Uuid, password_hash: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE staff SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, staff_id.to_string()],
        )?;
        Ok(())
    }

    /// Create a session
    #[instrument(skip(self, session), fields(staff_id = %session.staff_id))]
    pub fn create_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, staff_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.to_string(),
                session.staff_id.to_string(),
                session.created_at.to_rfc3339(),
                session.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find valid session
    #[instrument(skip(self))]
    pub fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, staff_id, created_at, expires_at FROM sessions WHERE id = ?1 AND expires_at > ?2",
        )?;

        let now = Utc::now().to_rfc3339();
        let session = stmt
            .query_row(params![session_id.to_string(), now], |row| {
                Ok(Session {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    staff_id: parse_uuid(&row.get::<_, String>(1)?)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?)?,
                    expires_at: parse_datetime(&row.get::<_, String>(3)?)?,
                })
            })
            .optional()?;

        Ok(session)
    }

    /// Delete session
    pub fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM sessions WHERE id = ?1",
            params![session_id.to_string()],
        )?;
        Ok(())
    }

    /// Delete every session of a staff member except `keep`
    pub fn delete_other_sessions(&self, staff_id: Uuid, keep: Uuid) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM sessions WHERE staff_id = ?1 AND id != ?2",
            params![staff_id.to_string(), keep.to_string()],
        )?;
        Ok(count as u64)
    }

    /// Clean up expired sessions
    pub fn cleanup_expired_sessions(&self) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(count as u64)
    }
}
