//! Storage repository traits
//!
//! The auth service and the room and guest handlers work against these
//! rather than the concrete SQLite stores.

use uuid::Uuid;

use crate::error::Result;
use crate::models::{Guest, Room, RoomFilter, Session, Staff};

/// Staff account and session operations
pub trait StaffRepository {
    /// Create a new staff account
    fn create_staff(&self, staff: &Staff) -> Result<()>;

    /// Find staff by ID
    fn find_staff_by_id(&self, id: Uuid) -> Result<Option<Staff>>;

    /// Find staff by username
    fn find_staff_by_username(&self, username: &str) -> Result<Option<Staff>>;

    /// Whether a username or email is already registered
    fn staff_exists(&self, username: &str, email: &str) -> Result<bool>;

    /// Number of staff accounts
    fn count_staff(&self) -> Result<u32>;

    /// Record a failed login, returning the attempt count
    fn record_failed_login(&self, staff_id: Uuid) -> Result<u32>;

    /// Reset attempts and stamp last login
    fn record_successful_login(&self, staff_id: Uuid) -> Result<()>;

    /// Replace the stored password hash
    fn update_password(&self, staff_id: Uuid, password_hash: &str) -> Result<()>;

    /// Create a session
    fn create_session(&self, session: &Session) -> Result<()>;

    /// Find a valid (non-expired) session
    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>>;

    /// Delete a session
    fn delete_session(&self, session_id: Uuid) -> Result<()>;

    /// Delete all sessions of a staff member except one
    fn delete_other_sessions(&self, staff_id: Uuid, keep: Uuid) -> Result<u64>;

    /// Clean up expired sessions
    fn cleanup_expired_sessions(&self) -> Result<u64>;
}

/// Room inventory operations
pub trait RoomRepository {
    fn create_room(&self, room: &Room) -> Result<()>;

    fn find_room_by_id(&self, id: Uuid) -> Result<Option<Room>>;

    fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>>;

    fn update_room(&self, room: &Room) -> Result<()>;

    /// Fails while the room holds active reservations
    fn delete_room(&self, id: Uuid) -> Result<()>;
}

/// Guest record operations
pub trait GuestRepository {
    fn create_guest(&self, guest: &Guest) -> Result<()>;

    fn find_guest_by_id(&self, id: Uuid) -> Result<Option<Guest>>;

    fn find_guest_by_email(&self, email: &str) -> Result<Option<Guest>>;

    fn list_guests(&self, search: Option<&str>) -> Result<Vec<Guest>>;

    fn update_guest(&self, guest: &Guest) -> Result<()>;

    /// Fails while the guest holds active reservations
    fn delete_guest(&self, id: Uuid) -> Result<()>;
}
