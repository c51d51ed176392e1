//! Request bodies and query strings

use chrono::NaiveDate;
use innkeep_core::{
    Error, Guest, IdType, PaymentKind, PaymentMethod, PaymentState, ReservationStatus, Result,
    Room, RoomStatus, RoomType, StaffRole,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterStaffRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: StaffRole,
}

/// Room fields; all required on create, any subset on update
#[derive(Debug, Default, Deserialize)]
pub struct RoomInput {
    pub room_number: Option<String>,
    pub room_type: Option<RoomType>,
    pub floor: Option<i32>,
    pub capacity: Option<u32>,
    pub price_per_night: Option<f64>,
    pub status: Option<RoomStatus>,
    pub amenities: Option<Vec<String>>,
    pub description: Option<String>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| Error::validation(format!("{field} is required")))
}

impl RoomInput {
    pub fn into_room(self) -> Result<Room> {
        let mut room = Room::new(
            required(self.room_number, "room_number")?.trim().to_string(),
            required(self.room_type, "room_type")?,
            required(self.floor, "floor")?,
            required(self.capacity, "capacity")?,
            required(self.price_per_night, "price_per_night")?,
        );
        if let Some(status) = self.status {
            room.status = status;
        }
        room.amenities = self.amenities.unwrap_or_default();
        room.description = self.description;
        Ok(room)
    }

    pub fn apply(self, room: &mut Room) {
        if let Some(v) = self.room_number {
            room.room_number = v.trim().to_string();
        }
        if let Some(v) = self.room_type {
            room.room_type = v;
        }
        if let Some(v) = self.floor {
            room.floor = v;
        }
        if let Some(v) = self.capacity {
            room.capacity = v;
        }
        if let Some(v) = self.price_per_night {
            room.price_per_night = v;
        }
        if let Some(v) = self.status {
            room.status = v;
        }
        if let Some(v) = self.amenities {
            room.amenities = v;
        }
        if self.description.is_some() {
            room.description = self.description;
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RoomStatusRequest {
    pub status: RoomStatus,
}

#[derive(Debug, Deserialize)]
pub struct AvailableRoomsQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub room_type: Option<RoomType>,
    pub capacity: Option<u32>,
}

/// Guest fields; names and email required on create
#[derive(Debug, Default, Deserialize)]
pub struct GuestInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub id_type: Option<IdType>,
    pub id_number: Option<String>,
    pub nationality: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub is_vip: Option<bool>,
}

/// Blank optional strings are stored as NULL so they never collide on UNIQUE
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl GuestInput {
    pub fn into_guest(self) -> Result<Guest> {
        let mut guest = Guest::new(
            required(self.first_name, "first_name")?,
            required(self.last_name, "last_name")?,
            &required(self.email, "email")?,
        );
        guest.phone = non_blank(self.phone);
        guest.id_type = self.id_type.unwrap_or_default();
        guest.id_number = non_blank(self.id_number);
        if let Some(nationality) = non_blank(self.nationality) {
            guest.nationality = nationality;
        }
        guest.date_of_birth = self.date_of_birth;
        guest.address = self.address;
        guest.city = self.city;
        guest.is_vip = self.is_vip.unwrap_or(false);
        Ok(guest)
    }

    pub fn apply(self, guest: &mut Guest) {
        if let Some(v) = self.first_name {
            guest.first_name = v;
        }
        if let Some(v) = self.last_name {
            guest.last_name = v;
        }
        if let Some(v) = self.email {
            guest.email = innkeep_core::normalize_email(&v);
        }
        if self.phone.is_some() {
            guest.phone = non_blank(self.phone);
        }
        if let Some(v) = self.id_type {
            guest.id_type = v;
        }
        if self.id_number.is_some() {
            guest.id_number = non_blank(self.id_number);
        }
        if let Some(v) = non_blank(self.nationality) {
            guest.nationality = v;
        }
        if self.date_of_birth.is_some() {
            guest.date_of_birth = self.date_of_birth;
        }
        if self.address.is_some() {
            guest.address = self.address;
        }
        if self.city.is_some() {
            guest.city = self.city;
        }
        if let Some(v) = self.is_vip {
            guest.is_vip = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoyaltyAction {
    Add,
    Deduct,
}

#[derive(Debug, Deserialize)]
pub struct LoyaltyRequest {
    pub action: LoyaltyAction,
    pub points: u32,
}

#[derive(Debug, Deserialize)]
pub struct ReservationInput {
    pub guest_id: Option<Uuid>,
    /// Inline guest, reused by email when one already exists
    pub guest: Option<GuestInput>,
    pub room_id: Uuid,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub total_amount: Option<f64>,
    pub special_requests: Option<String>,
    pub status: Option<ReservationStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReservationPatch {
    pub room_id: Option<Uuid>,
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub total_amount: Option<f64>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub room_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub exclude: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReservationStatusRequest {
    pub status: ReservationStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

/// `?date=YYYY-MM-DD`, defaulting to the server's local day
#[derive(Debug, Default, Deserialize)]
pub struct DayQuery {
    pub date: Option<NaiveDate>,
}

impl DayQuery {
    pub fn day(&self) -> NaiveDate {
        self.date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentInput {
    pub reservation_id: Uuid,
    pub amount: f64,
    pub payment_method: PaymentMethod,
    pub payment_type: Option<PaymentKind>,
    pub currency: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub status: Option<PaymentState>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    pub status: PaymentState,
}
