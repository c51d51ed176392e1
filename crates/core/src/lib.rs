//! Innkeep Core Library
//!
//! Models, the reservation and availability engine, staff authentication,
//! permissions, configuration and SQLite storage for the Innkeep back office.

pub mod auth;
pub mod booking;
pub mod config;
pub mod error;
pub mod invariants;
pub mod models;
pub mod permissions;
pub mod storage;

pub use auth::{AuthPolicy, AuthService, LoginOutcome, NewStaff};
pub use booking::{BookingEngine, GuestChoice, NewPayment, NewReservation, ReservationUpdate};
pub use config::{BootstrapAdmin, Config};
pub use error::{Error, Result};
pub use models::*;
pub use permissions::*;
pub use storage::{
    DashboardSummary, Database, GuestRepository, RoomRepository, StaffRepository,
};
