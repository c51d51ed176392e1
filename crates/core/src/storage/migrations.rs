//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Staff accounts
            CREATE TABLE IF NOT EXISTS staff (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                login_attempts INTEGER NOT NULL DEFAULT 0,
                last_login TEXT,
                created_at TEXT NOT NULL
            );

            -- Sessions table
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                staff_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY (staff_id) REFERENCES staff(id) ON DELETE CASCADE
            );

            -- Room inventory
            CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                room_number TEXT NOT NULL UNIQUE,
                room_type TEXT NOT NULL,
                floor INTEGER NOT NULL,
                capacity INTEGER NOT NULL CHECK (capacity >= 1),
                price_per_night REAL NOT NULL CHECK (price_per_night >= 0),
                status TEXT NOT NULL DEFAULT 'available',
                -- JSON array of strings
                amenities TEXT NOT NULL DEFAULT '[]',
                description TEXT,
                last_cleaned TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Guests
            CREATE TABLE IF NOT EXISTS guests (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                phone TEXT UNIQUE,
                id_type TEXT NOT NULL DEFAULT 'ktp',
                id_number TEXT UNIQUE,
                nationality TEXT NOT NULL DEFAULT 'Indonesia',
                date_of_birth TEXT,
                address TEXT,
                city TEXT,
                loyalty_points INTEGER NOT NULL DEFAULT 0,
                is_vip INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Reservations; dates are YYYY-MM-DD, stay is [check_in_date, check_out_date)
            CREATE TABLE IF NOT EXISTS reservations (
                id TEXT PRIMARY KEY,
                reservation_code TEXT NOT NULL UNIQUE,
                guest_id TEXT NOT NULL,
                room_id TEXT NOT NULL,
                check_in_date TEXT NOT NULL,
                check_out_date TEXT NOT NULL,
                adults INTEGER NOT NULL DEFAULT 1 CHECK (adults >= 1),
                children INTEGER NOT NULL DEFAULT 0,
                total_amount REAL NOT NULL DEFAULT 0,
                special_requests TEXT,
                status TEXT NOT NULL DEFAULT 'confirmed',
                payment_status TEXT NOT NULL DEFAULT 'pending',
                cancellation_reason TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (check_out_date > check_in_date),
                FOREIGN KEY (guest_id) REFERENCES guests(id) ON DELETE CASCADE,
                FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE CASCADE
            );

            -- Payments
            CREATE TABLE IF NOT EXISTS payments (
                id TEXT PRIMARY KEY,
                payment_code TEXT NOT NULL UNIQUE,
                reservation_id TEXT NOT NULL,
                amount REAL NOT NULL CHECK (amount > 0),
                method TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'full_payment',
                currency TEXT NOT NULL DEFAULT 'IDR',
                transaction_id TEXT,
                notes TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                paid_at TEXT,
                refunded_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (reservation_id) REFERENCES reservations(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for query performance",
        sql: r#"
            -- Session indexes
            CREATE INDEX IF NOT EXISTS idx_sessions_staff ON sessions(staff_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);

            -- Availability lookups hit (room_id, status, dates)
            CREATE INDEX IF NOT EXISTS idx_reservations_room_dates
                ON reservations(room_id, status, check_in_date, check_out_date);
            CREATE INDEX IF NOT EXISTS idx_reservations_guest ON reservations(guest_id);
            CREATE INDEX IF NOT EXISTS idx_reservations_check_in ON reservations(check_in_date);
            CREATE INDEX IF NOT EXISTS idx_reservations_check_out ON reservations(check_out_date);

            -- Room and payment indexes
            CREATE INDEX IF NOT EXISTS idx_rooms_status ON rooms(status);
            CREATE INDEX IF NOT EXISTS idx_rooms_type ON rooms(room_type);
            CREATE INDEX IF NOT EXISTS idx_payments_reservation ON payments(reservation_id);
            CREATE INDEX IF NOT EXISTS idx_payments_status ON payments(status);
        "#,
    },
    Migration {
        version: 3,
        description: "Reject overlapping active reservations",
        sql: r#"
            -- Backstop for the engine's own check: no two confirmed/checked_in
            -- reservations on one room may share a night
            CREATE TRIGGER IF NOT EXISTS reservations_no_overlap_insert
            BEFORE INSERT ON reservations
            WHEN NEW.status IN ('confirmed', 'checked_in')
            BEGIN
                SELECT RAISE(ABORT, 'room_unavailable')
                WHERE EXISTS (
                    SELECT 1 FROM reservations r
                    WHERE r.room_id = NEW.room_id
                      AND r.status IN ('confirmed', 'checked_in')
                      AND r.check_in_date < NEW.check_out_date
                      AND r.check_out_date > NEW.check_in_date
                );
            END;

            CREATE TRIGGER IF NOT EXISTS reservations_no_overlap_update
            BEFORE UPDATE OF room_id, check_in_date, check_out_date, status ON reservations
            WHEN NEW.status IN ('confirmed', 'checked_in')
            BEGIN
                SELECT RAISE(ABORT, 'room_unavailable')
                WHERE EXISTS (
                    SELECT 1 FROM reservations r
                    WHERE r.room_id = NEW.room_id
                      AND r.id != NEW.id
                      AND r.status IN ('confirmed', 'checked_in')
                      AND r.check_in_date < NEW.check_out_date
                      AND r.check_out_date > NEW.check_in_date
                );
            END;
        "#,
    },
    Migration {
        version: 4,
        description: "Refuse deleting rooms and guests with active reservations",
        sql: r#"
            -- Reservations cascade on delete, so the guard has to run inside
            -- the DELETE itself
            CREATE TRIGGER IF NOT EXISTS rooms_keep_active_reservations
            BEFORE DELETE ON rooms
            BEGIN
                SELECT RAISE(ABORT, 'room_has_active_reservations')
                WHERE EXISTS (
                    SELECT 1 FROM reservations r
                    WHERE r.room_id = OLD.id
                      AND r.status IN ('confirmed', 'checked_in')
                );
            END;

            CREATE TRIGGER IF NOT EXISTS guests_keep_active_reservations
            BEFORE DELETE ON guests
            BEGIN
                SELECT RAISE(ABORT, 'guest_has_active_reservations')
                WHERE EXISTS (
                    SELECT 1 FROM reservations r
                    WHERE r.guest_id = OLD.id
                      AND r.status IN ('confirmed', 'checked_in')
                );
            END;
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;

            info!(version = migration.version, "Migration complete");
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}
