//! Reservation and availability engine
//!
//! Owns the rule that no two active reservations (`confirmed`,
//! `checked_in`) of one room share a night, and the reservation lifecycle.
//! Every mutation that reads availability runs inside one `BEGIN IMMEDIATE`
//! transaction, so a concurrent writer blocks until the first commits and
//! then sees its booking.

mod payments;

use chrono::{NaiveDate, Utc};
use rusqlite::Transaction;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    generate_code, Guest, PaymentStatus, Reservation, ReservationStatus, Room, RoomStatus,
    RoomType, StayDates,
};
use crate::storage::{is_overlap_abort, Database, GuestStore, ReservationStore, RoomStore};

pub use payments::NewPayment;

/// Guest a new reservation is made for
#[derive(Debug, Clone)]
pub enum GuestChoice {
    Existing(Uuid),
    /// Reused if a guest with the same email exists, created otherwise
    New(Guest),
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub guest: GuestChoice,
    pub room_id: Uuid,
    pub stay: StayDates,
    pub adults: u32,
    pub children: u32,
    /// Defaults to nights x price per night
    pub total_amount: Option<f64>,
    pub special_requests: Option<String>,
    /// `confirmed` or `pending`
    pub status: ReservationStatus,
}

impl NewReservation {
    pub fn new(guest_id: Uuid, room_id: Uuid, stay: StayDates) -> Self {
        Self {
            guest: GuestChoice::Existing(guest_id),
            room_id,
            stay,
            adults: 1,
            children: 0,
            total_amount: None,
            special_requests: None,
            status: ReservationStatus::Confirmed,
        }
    }
}

/// Partial edit of a reservation; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct ReservationUpdate {
    pub room_id: Option<Uuid>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub total_amount: Option<f64>,
    pub special_requests: Option<String>,
}

const MAX_CODE_ATTEMPTS: usize = 3;

pub struct BookingEngine<'a> {
    db: &'a Database,
}

impl<'a> BookingEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Whether `room_id` is free for `[check_in, check_out)`, ignoring `exclude`
    #[instrument(skip(self))]
    pub fn check_availability(
        &self,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        let stay = StayDates::new(check_in, check_out)?;
        self.db.rooms().get(room_id)?;
        let taken = self.db.reservations().has_conflict(room_id, &stay, exclude)?;
        Ok(!taken)
    }

    /// Sellable rooms free for the whole stay
    pub fn available_rooms(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        room_type: Option<RoomType>,
        min_capacity: Option<u32>,
    ) -> Result<Vec<Room>> {
        let stay = StayDates::new(check_in, check_out)?;
        self.db.rooms().list_available(&stay, room_type, min_capacity)
    }

    /// Book a room after an availability check
    #[instrument(skip(self, req), fields(room_id = %req.room_id, check_in = %req.stay.check_in, check_out = %req.stay.check_out))]
    pub fn create_reservation(&self, req: NewReservation) -> Result<Reservation> {
        if !matches!(
            req.status,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        ) {
            return Err(Error::validation(
                "New reservations must be pending or confirmed",
            ));
        }
        if req.adults < 1 {
            return Err(Error::validation("At least one adult is required"));
        }

        let tx = self.db.immediate()?;
        let room = RoomStore::new(&tx).get(req.room_id)?;
        check_capacity(&room, req.adults)?;
        let guest_id = resolve_guest(&tx, req.guest)?;

        if req.status.is_active() {
            ensure_free(&tx, room.id, &req.stay, None)?;
        }

        let total_amount = match req.total_amount {
            Some(amount) if !amount.is_finite() || amount < 0.0 => {
                return Err(Error::validation("Total amount must be zero or more"));
            }
            Some(amount) => amount,
            None => default_total(&room, &req.stay),
        };

        let now = Utc::now();
        let mut reservation = Reservation {
            id: Uuid::new_v4(),
            reservation_code: generate_code("RSV", now),
            guest_id,
            room_id: room.id,
            stay: req.stay,
            adults: req.adults,
            children: req.children,
            total_amount,
            special_requests: req.special_requests,
            status: req.status,
            payment_status: PaymentStatus::Pending,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match ReservationStore::new(&tx).insert(&reservation) {
                Ok(()) => break,
                Err(Error::Duplicate(column))
                    if column.contains("reservation_code") && attempt < MAX_CODE_ATTEMPTS =>
                {
                    reservation.reservation_code = generate_code("RSV", now);
                }
                Err(e) => return Err(map_overlap(e, room.id, &reservation.stay)),
            }
        }

        check_room_invariants(&tx, room.id)?;
        tx.commit()?;

        info!(
            reservation_id = %reservation.id,
            code = %reservation.reservation_code,
            status = reservation.status.as_str(),
            "Reservation created"
        );
        Ok(reservation)
    }

    /// Edit a non-terminal reservation, re-checking availability when the
    /// room or dates change
    #[instrument(skip(self, update))]
    pub fn update_reservation(&self, id: Uuid, update: ReservationUpdate) -> Result<Reservation> {
        let tx = self.db.immediate()?;
        let store = ReservationStore::new(&tx);
        let mut reservation = store.get(id)?;

        if reservation.status.is_terminal() {
            return Err(Error::validation(format!(
                "Cannot modify a {} reservation",
                reservation.status
            )));
        }

        let stay = StayDates::new(
            update.check_in.unwrap_or(reservation.stay.check_in),
            update.check_out.unwrap_or(reservation.stay.check_out),
        )?;
        let room_id = update.room_id.unwrap_or(reservation.room_id);
        if room_id != reservation.room_id && reservation.status == ReservationStatus::CheckedIn {
            return Err(Error::validation(
                "Cannot move a checked-in reservation to another room",
            ));
        }
        let moved = room_id != reservation.room_id || stay != reservation.stay;

        let room = RoomStore::new(&tx).get(room_id)?;
        let adults = update.adults.unwrap_or(reservation.adults);
        if adults < 1 {
            return Err(Error::validation("At least one adult is required"));
        }
        check_capacity(&room, adults)?;

        if moved && reservation.status.is_active() {
            ensure_free(&tx, room_id, &stay, Some(id))?;
        }

        let previous_total = reservation.total_amount;
        reservation.total_amount = match update.total_amount {
            Some(amount) if !amount.is_finite() || amount < 0.0 => {
                return Err(Error::validation("Total amount must be zero or more"));
            }
            Some(amount) => amount,
            None if moved => default_total(&room, &stay),
            None => reservation.total_amount,
        };
        reservation.room_id = room_id;
        reservation.stay = stay;
        reservation.adults = adults;
        if let Some(children) = update.children {
            reservation.children = children;
        }
        if update.special_requests.is_some() {
            reservation.special_requests = update.special_requests;
        }
        reservation.updated_at = Utc::now();

        store
            .update(&reservation)
            .map_err(|e| map_overlap(e, room_id, &stay))?;
        if reservation.total_amount != previous_total {
            reservation.payment_status = payments::recompute(&tx, id)?;
        }
        check_room_invariants(&tx, room_id)?;
        tx.commit()?;

        info!(reservation_id = %id, moved, "Reservation updated");
        Ok(reservation)
    }

    /// Move a reservation along its lifecycle, applying room side effects
    #[instrument(skip(self, reason))]
    pub fn transition(
        &self,
        id: Uuid,
        next: ReservationStatus,
        reason: Option<String>,
    ) -> Result<Reservation> {
        let tx = self.db.immediate()?;
        let store = ReservationStore::new(&tx);
        let rooms = RoomStore::new(&tx);
        let mut reservation = store.get(id)?;
        let from = reservation.status;

        if !from.can_transition_to(next) {
            warn!(reservation_id = %id, %from, to = %next, "Rejected status change");
            return Err(Error::InvalidTransition { from, to: next });
        }

        match next {
            ReservationStatus::Confirmed => {
                // pending holds no inventory, so the room may have been taken since
                ensure_free(&tx, reservation.room_id, &reservation.stay, Some(id))?;
            }
            ReservationStatus::CheckedIn => {
                let room = rooms.get(reservation.room_id)?;
                if !room.status.is_sellable() {
                    return Err(Error::validation(format!(
                        "Room {} is {} and cannot take guests",
                        room.room_number, room.status
                    )));
                }
                rooms.update_status(room.id, RoomStatus::Occupied)?;
            }
            ReservationStatus::CheckedOut => {
                rooms.update_status(reservation.room_id, RoomStatus::Cleaning)?;
            }
            ReservationStatus::Cancelled => {
                reservation.cancellation_reason = reason;
            }
            ReservationStatus::Pending | ReservationStatus::NoShow => {}
        }

        reservation.status = next;
        reservation.updated_at = Utc::now();
        store
            .update(&reservation)
            .map_err(|e| map_overlap(e, reservation.room_id, &reservation.stay))?;
        check_room_invariants(&tx, reservation.room_id)?;
        tx.commit()?;

        info!(reservation_id = %id, %from, to = %next, "Reservation status changed");
        Ok(reservation)
    }

    pub fn confirm(&self, id: Uuid) -> Result<Reservation> {
        self.transition(id, ReservationStatus::Confirmed, None)
    }

    pub fn check_in(&self, id: Uuid) -> Result<Reservation> {
        self.transition(id, ReservationStatus::CheckedIn, None)
    }

    pub fn check_out(&self, id: Uuid) -> Result<Reservation> {
        self.transition(id, ReservationStatus::CheckedOut, None)
    }

    /// Cancel a reservation that has not started; frees its nights
    pub fn cancel(&self, id: Uuid, reason: Option<String>) -> Result<Reservation> {
        self.transition(id, ReservationStatus::Cancelled, reason)
    }

    /// Remove a reservation that never reached the room
    #[instrument(skip(self))]
    pub fn delete_reservation(&self, id: Uuid) -> Result<()> {
        let tx = self.db.immediate()?;
        let store = ReservationStore::new(&tx);
        let reservation = store.get(id)?;

        if matches!(
            reservation.status,
            ReservationStatus::CheckedIn | ReservationStatus::CheckedOut
        ) {
            return Err(Error::validation(format!(
                "Cannot delete a {} reservation",
                reservation.status
            )));
        }

        store.delete(id)?;
        tx.commit()?;
        info!(reservation_id = %id, "Reservation deleted");
        Ok(())
    }
}

fn check_capacity(room: &Room, adults: u32) -> Result<()> {
    if adults > room.capacity {
        return Err(Error::validation(format!(
            "Room {} holds at most {} adults",
            room.room_number, room.capacity
        )));
    }
    Ok(())
}

fn default_total(room: &Room, stay: &StayDates) -> f64 {
    stay.nights() as f64 * room.price_per_night
}

fn resolve_guest(tx: &Transaction<'_>, choice: GuestChoice) -> Result<Uuid> {
    let guests = GuestStore::new(tx);
    match choice {
        GuestChoice::Existing(id) => Ok(guests.get(id)?.id),
        GuestChoice::New(guest) => {
            if let Some(existing) = guests.find_by_email(&guest.email)? {
                return Ok(existing.id);
            }
            guests.create(&guest)?;
            Ok(guest.id)
        }
    }
}

fn ensure_free(
    tx: &Transaction<'_>,
    room_id: Uuid,
    stay: &StayDates,
    exclude: Option<Uuid>,
) -> Result<()> {
    if ReservationStore::new(tx).has_conflict(room_id, stay, exclude)? {
        warn!(%room_id, check_in = %stay.check_in, check_out = %stay.check_out, "Room no longer available");
        return Err(Error::RoomUnavailable {
            room_id,
            check_in: stay.check_in,
            check_out: stay.check_out,
        });
    }
    Ok(())
}

/// Writes rejected by the overlap triggers surface as `RoomUnavailable`
fn map_overlap(err: Error, room_id: Uuid, stay: &StayDates) -> Error {
    match err {
        Error::Database(ref e) if is_overlap_abort(e) => {
            warn!(%room_id, "Overlap trigger rejected write");
            Error::RoomUnavailable {
                room_id,
                check_in: stay.check_in,
                check_out: stay.check_out,
            }
        }
        other => other,
    }
}

#[cfg(debug_assertions)]
fn check_room_invariants(tx: &Transaction<'_>, room_id: Uuid) -> Result<()> {
    use crate::invariants::*;

    assert_id_valid(room_id, "check_room_invariants");
    assert_room_invariants(&RoomStore::new(tx).get(room_id)?);
    let active = ReservationStore::new(tx).list_active_for_room(room_id)?;
    for reservation in &active {
        assert_reservation_invariants(reservation);
    }
    assert_no_overlapping_active(&active);
    Ok(())
}

#[cfg(not(debug_assertions))]
fn check_room_invariants(_tx: &Transaction<'_>, _room_id: Uuid) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests;
