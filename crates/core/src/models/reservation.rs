//! Reservation model and stay interval

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Years outside this range do not sort correctly as `YYYY-MM-DD` text
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// Half-open stay interval `[check_in, check_out)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayDates {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayDates {
    /// Rejects empty and inverted intervals and dates outside years 1..=9999.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self> {
        for date in [check_in, check_out] {
            if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
                return Err(Error::validation(format!(
                    "Date {date} is outside the supported range"
                )));
            }
        }
        if check_out <= check_in {
            return Err(Error::validation(
                "Check-out date must be after check-in date",
            ));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Back-to-back stays (one's check-out equals the other's check-in) do not overlap.
    pub fn overlaps(&self, other: &StayDates) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    /// True if a guest is in the room on the night starting `date`
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }
}

/// Reservation lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::CheckedIn => "checked_in",
            ReservationStatus::CheckedOut => "checked_out",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::NoShow => "no_show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReservationStatus::Pending),
            "confirmed" => Some(ReservationStatus::Confirmed),
            "checked_in" => Some(ReservationStatus::CheckedIn),
            "checked_out" => Some(ReservationStatus::CheckedOut),
            "cancelled" => Some(ReservationStatus::Cancelled),
            "no_show" => Some(ReservationStatus::NoShow),
            _ => None,
        }
    }

    /// Active reservations hold room inventory
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Confirmed | ReservationStatus::CheckedIn
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::CheckedOut | ReservationStatus::Cancelled | ReservationStatus::NoShow
        )
    }

    /// Allowed edges of the lifecycle graph
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, NoShow)
                | (Confirmed, CheckedIn)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (CheckedIn, CheckedOut)
        )
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement state of a reservation, derived from its payments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// A booking of one room by one guest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub reservation_code: String,
    pub guest_id: Uuid,
    pub room_id: Uuid,
    #[serde(flatten)]
    pub stay: StayDates,
    pub adults: u32,
    pub children: u32,
    pub total_amount: f64,
    pub special_requests: Option<String>,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn nights(&self) -> i64 {
        self.stay.nights()
    }
}

/// Reservation joined with guest and room display fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub guest_name: String,
    pub guest_email: String,
    pub room_number: String,
    pub nights: i64,
}

/// Optional filters for reservation listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
    pub room_id: Option<Uuid>,
    pub guest_id: Option<Uuid>,
    /// Stays starting on or after this date
    pub check_in_from: Option<NaiveDate>,
    /// Stays ending on or before this date
    pub check_out_to: Option<NaiveDate>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn stay(a: &str, b: &str) -> StayDates {
        StayDates::new(d(a), d(b)).unwrap()
    }

    #[test]
    fn test_empty_and_inverted_stays_rejected() {
        assert!(StayDates::new(d("2025-06-10"), d("2025-06-10")).is_err());
        assert!(StayDates::new(d("2025-06-12"), d("2025-06-10")).is_err());
    }

    #[test]
    fn test_years_past_9999_rejected() {
        let last = NaiveDate::from_ymd_opt(9999, 12, 30).unwrap();
        let beyond = NaiveDate::from_ymd_opt(10000, 1, 2).unwrap();
        let err = StayDates::new(last, beyond).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let year_end = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap();
        assert_eq!(StayDates::new(last, year_end).unwrap().nights(), 1);
    }

    #[test]
    fn test_nights() {
        assert_eq!(stay("2025-06-10", "2025-06-12").nights(), 2);
        assert_eq!(stay("2025-06-30", "2025-07-01").nights(), 1);
    }

    #[test]
    fn test_overlap() {
        let a = stay("2025-06-10", "2025-06-12");
        assert!(a.overlaps(&stay("2025-06-11", "2025-06-13")));
        assert!(a.overlaps(&stay("2025-06-09", "2025-06-11")));
        assert!(a.overlaps(&stay("2025-06-01", "2025-06-30")));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn test_same_day_turnover_is_not_overlap() {
        let a = stay("2025-06-10", "2025-06-12");
        assert!(!a.overlaps(&stay("2025-06-12", "2025-06-14")));
        assert!(!a.overlaps(&stay("2025-06-08", "2025-06-10")));
    }

    #[test]
    fn test_contains_is_half_open() {
        let a = stay("2025-06-10", "2025-06-12");
        assert!(a.contains(d("2025-06-10")));
        assert!(a.contains(d("2025-06-11")));
        assert!(!a.contains(d("2025-06-12")));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        use ReservationStatus::*;
        let all = [Pending, Confirmed, CheckedIn, CheckedOut, Cancelled, NoShow];
        for from in [CheckedOut, Cancelled, NoShow] {
            assert!(from.is_terminal());
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_checked_in_cannot_be_cancelled() {
        assert!(!ReservationStatus::CheckedIn.can_transition_to(ReservationStatus::Cancelled));
        assert!(!ReservationStatus::CheckedIn.can_transition_to(ReservationStatus::NoShow));
        assert!(ReservationStatus::CheckedIn.can_transition_to(ReservationStatus::CheckedOut));
    }

    #[test]
    fn test_status_strings_roundtrip() {
        use ReservationStatus::*;
        for s in [Pending, Confirmed, CheckedIn, CheckedOut, Cancelled, NoShow] {
            assert_eq!(ReservationStatus::parse(s.as_str()), Some(s));
        }
    }
}
