//! SQLite storage layer for Innkeep

mod dashboard;
mod guests;
mod migrations;
mod parse;
mod payments;
mod reservations;
mod rooms;
mod staff;
mod traits;

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Guest, Room, RoomFilter, Session, Staff};

pub use dashboard::{DashboardStore, DashboardSummary, RoomStatusCount};
pub use guests::GuestStore;
pub use parse::{format_date, is_overlap_abort};
pub use payments::{PaymentStore, PaymentTotals};
pub use reservations::ReservationStore;
pub use rooms::RoomStore;
pub use staff::StaffStore;
pub use traits::{GuestRepository, RoomRepository, StaffRepository};

/// How long a writer waits on a locked database before giving up
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open or create a file database in WAL mode with the given busy timeout
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open_with_timeout<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(journal_mode = %mode, "Database opened");
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Begin a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front, so reads made inside the
    /// transaction cannot be invalidated by another writer before commit.
    pub fn immediate(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    pub fn rooms(&self) -> RoomStore<'_> {
        RoomStore::new(&self.conn)
    }

    pub fn guests(&self) -> GuestStore<'_> {
        GuestStore::new(&self.conn)
    }

    pub fn reservations(&self) -> ReservationStore<'_> {
        ReservationStore::new(&self.conn)
    }

    pub fn payments(&self) -> PaymentStore<'_> {
        PaymentStore::new(&self.conn)
    }

    pub fn staff(&self) -> StaffStore<'_> {
        StaffStore::new(&self.conn)
    }

    pub fn dashboard(&self) -> DashboardStore<'_> {
        DashboardStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl StaffRepository for Database {
    fn create_staff(&self, staff: &Staff) -> Result<()> {
        self.staff().create(staff)
    }

    fn find_staff_by_id(&self, id: Uuid) -> Result<Option<Staff>> {
        self.staff().find_by_id(id)
    }

    fn find_staff_by_username(&self, username: &str) -> Result<Option<Staff>> {
        self.staff().find_by_username(username)
    }

    fn staff_exists(&self, username: &str, email: &str) -> Result<bool> {
        self.staff().username_or_email_taken(username, email)
    }

    fn count_staff(&self) -> Result<u32> {
        self.staff().count()
    }

    fn record_failed_login(&self, staff_id: Uuid) -> Result<u32> {
        self.staff().record_failed_login(staff_id)
    }

    fn record_successful_login(&self, staff_id: Uuid) -> Result<()> {
        self.staff().record_successful_login(staff_id)
    }

    fn update_password(&self, staff_id: Uuid, password_hash: &str) -> Result<()> {
        self.staff().update_password(staff_id, password_hash)
    }

    fn create_session(&self, session: &Session) -> Result<()> {
        self.staff().create_session(session)
    }

    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        self.staff().find_valid_session(session_id)
    }

    fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.staff().delete_session(session_id)
    }

    fn delete_other_sessions(&self, staff_id: Uuid, keep: Uuid) -> Result<u64> {
        self.staff().delete_other_sessions(staff_id, keep)
    }

    fn cleanup_expired_sessions(&self) -> Result<u64> {
        self.staff().cleanup_expired_sessions()
    }
}

impl RoomRepository for Database {
    fn create_room(&self, room: &Room) -> Result<()> {
        self.rooms().create(room)
    }

    fn find_room_by_id(&self, id: Uuid) -> Result<Option<Room>> {
        self.rooms().find_by_id(id)
    }

    fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>> {
        self.rooms().list(filter)
    }

    fn update_room(&self, room: &Room) -> Result<()> {
        self.rooms().update(room)
    }

    fn delete_room(&self, id: Uuid) -> Result<()> {
        self.rooms().delete(id)
    }
}

impl GuestRepository for Database {
    fn create_guest(&self, guest: &Guest) -> Result<()> {
        self.guests().create(guest)
    }

    fn find_guest_by_id(&self, id: Uuid) -> Result<Option<Guest>> {
        self.guests().find_by_id(id)
    }

    fn find_guest_by_email(&self, email: &str) -> Result<Option<Guest>> {
        self.guests().find_by_email(email)
    }

    fn list_guests(&self, search: Option<&str>) -> Result<Vec<Guest>> {
        self.guests().list(search)
    }

    fn update_guest(&self, guest: &Guest) -> Result<()> {
        self.guests().update(guest)
    }

    fn delete_guest(&self, id: Uuid) -> Result<()> {
        self.guests().delete(id)
    }
}
