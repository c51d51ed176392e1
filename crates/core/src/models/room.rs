//! Room inventory model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Room category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Standard,
    Deluxe,
    Suite,
    Family,
    Presidential,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Standard => "standard",
            RoomType::Deluxe => "deluxe",
            RoomType::Suite => "suite",
            RoomType::Family => "family",
            RoomType::Presidential => "presidential",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(RoomType::Standard),
            "deluxe" => Some(RoomType::Deluxe),
            "suite" => Some(RoomType::Suite),
            "family" => Some(RoomType::Family),
            "presidential" => Some(RoomType::Presidential),
            _ => None,
        }
    }
}

/// Housekeeping status of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
    Cleaning,
    OutOfOrder,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "available",
            RoomStatus::Occupied => "occupied",
            RoomStatus::Maintenance => "maintenance",
            RoomStatus::Cleaning => "cleaning",
            RoomStatus::OutOfOrder => "out-of-order",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(RoomStatus::Available),
            "occupied" => Some(RoomStatus::Occupied),
            "maintenance" => Some(RoomStatus::Maintenance),
            "cleaning" => Some(RoomStatus::Cleaning),
            "out-of-order" => Some(RoomStatus::OutOfOrder),
            _ => None,
        }
    }

    /// Rooms in these states cannot take new guests at all
    pub fn is_sellable(&self) -> bool {
        !matches!(self, RoomStatus::Maintenance | RoomStatus::OutOfOrder)
    }

    pub fn all() -> &'static [RoomStatus] {
        &[
            RoomStatus::Available,
            RoomStatus::Occupied,
            RoomStatus::Maintenance,
            RoomStatus::Cleaning,
            RoomStatus::OutOfOrder,
        ]
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bookable room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub room_number: String,
    pub room_type: RoomType,
    pub floor: i32,
    pub capacity: u32,
    pub price_per_night: f64,
    pub status: RoomStatus,
    pub amenities: Vec<String>,
    pub description: Option<String>,
    pub last_cleaned: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(
        room_number: String,
        room_type: RoomType,
        floor: i32,
        capacity: u32,
        price_per_night: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            room_number,
            room_type,
            floor,
            capacity,
            price_per_night,
            status: RoomStatus::Available,
            amenities: Vec::new(),
            description: None,
            last_cleaned: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_amenities(mut self, amenities: Vec<String>) -> Self {
        self.amenities = amenities;
        self
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.room_number.trim().is_empty() {
            return Err(Error::validation("Room number is required"));
        }
        if self.capacity < 1 {
            return Err(Error::validation("Capacity must be at least 1"));
        }
        if !self.price_per_night.is_finite() || self.price_per_night < 0.0 {
            return Err(Error::validation("Price per night must be zero or more"));
        }
        Ok(())
    }
}

/// Optional filters for room listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomFilter {
    pub room_type: Option<RoomType>,
    pub status: Option<RoomStatus>,
    pub floor: Option<i32>,
    pub min_capacity: Option<u32>,
    pub search: Option<String>,
}
