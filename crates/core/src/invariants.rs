//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use uuid::Uuid;

use crate::models::{Reservation, Room};

/// Validate that a room's stored values are sane
pub fn assert_room_invariants(room: &Room) {
    debug_assert!(
        !room.room_number.trim().is_empty(),
        "Room {} has empty room_number",
        room.id
    );

    debug_assert!(
        room.capacity >= 1,
        "Room {} has capacity {}",
        room.id,
        room.capacity
    );

    debug_assert!(
        room.price_per_night >= 0.0,
        "Room {} has negative price {}",
        room.id,
        room.price_per_night
    );
}

/// Validate that a reservation is internally consistent
pub fn assert_reservation_invariants(reservation: &Reservation) {
    debug_assert!(
        reservation.stay.check_in < reservation.stay.check_out,
        "Reservation {} has empty stay {} .. {}",
        reservation.id,
        reservation.stay.check_in,
        reservation.stay.check_out
    );

    debug_assert!(
        reservation.adults >= 1,
        "Reservation {} has no adults",
        reservation.id
    );

    debug_assert!(
        reservation.updated_at >= reservation.created_at,
        "Reservation {} updated before it was created",
        reservation.id
    );
}

/// Active reservations of one room must be pairwise disjoint
pub fn assert_no_overlapping_active(reservations: &[Reservation]) {
    let active: Vec<&Reservation> = reservations
        .iter()
        .filter(|r| r.status.is_active())
        .collect();

    for (i, a) in active.iter().enumerate() {
        for b in &active[i + 1..] {
            debug_assert!(
                a.room_id != b.room_id || !a.stay.overlaps(&b.stay),
                "Room {} double-booked by {} and {}",
                a.room_id,
                a.id,
                b.id
            );
        }
    }
}

/// Validate that an id is not nil
pub fn assert_id_valid(id: Uuid, context: &str) {
    debug_assert!(id != Uuid::nil(), "Nil id in context: {}", context);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentStatus, ReservationStatus, RoomType, StayDates};
    use chrono::{NaiveDate, Utc};

    fn reservation(room_id: Uuid, from: &str, to: &str, status: ReservationStatus) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: Uuid::new_v4(),
            reservation_code: "RSV2506100001".to_string(),
            guest_id: Uuid::new_v4(),
            room_id,
            stay: StayDates::new(
                NaiveDate::parse_from_str(from, "%Y-%m-%d").unwrap(),
                NaiveDate::parse_from_str(to, "%Y-%m-%d").unwrap(),
            )
            .unwrap(),
            adults: 1,
            children: 0,
            total_amount: 0.0,
            special_requests: None,
            status,
            payment_status: PaymentStatus::Pending,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_valid_room() {
        let room = Room::new("101".into(), RoomType::Standard, 1, 2, 500_000.0);
        assert_room_invariants(&room);
    }

    #[test]
    fn test_adjacent_stays_pass() {
        let room = Uuid::new_v4();
        assert_no_overlapping_active(&[
            reservation(room, "2025-06-10", "2025-06-12", ReservationStatus::Confirmed),
            reservation(room, "2025-06-12", "2025-06-14", ReservationStatus::CheckedIn),
        ]);
    }

    #[test]
    fn test_cancelled_overlap_is_ignored() {
        let room = Uuid::new_v4();
        assert_no_overlapping_active(&[
            reservation(room, "2025-06-10", "2025-06-12", ReservationStatus::Confirmed),
            reservation(room, "2025-06-11", "2025-06-13", ReservationStatus::Cancelled),
        ]);
    }

    #[test]
    #[should_panic(expected = "double-booked")]
    fn test_overlap_is_caught() {
        let room = Uuid::new_v4();
        assert_no_overlapping_active(&[
            reservation(room, "2025-06-10", "2025-06-12", ReservationStatus::Confirmed),
            reservation(room, "2025-06-11", "2025-06-13", ReservationStatus::Confirmed),
        ]);
    }

    #[test]
    #[should_panic(expected = "Nil id")]
    fn test_nil_id() {
        assert_id_valid(Uuid::nil(), "test");
    }
}
