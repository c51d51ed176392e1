//! Payments against reservations and the derived reservation payment status

use chrono::Utc;
use rusqlite::Transaction;
use tracing::{info, instrument};
use uuid::Uuid;

use super::BookingEngine;
use crate::error::{Error, Result};
use crate::models::{
    Payment, PaymentKind, PaymentMethod, PaymentState, PaymentStatus, ReservationStatus,
};
use crate::storage::{PaymentStore, ReservationStore};

/// Tolerance when comparing money sums
const CENT: f64 = 0.005;

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub reservation_id: Uuid,
    pub amount: f64,
    pub method: PaymentMethod,
    pub kind: PaymentKind,
    pub currency: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    /// Initial state; `pending` unless the money is already in hand
    pub status: PaymentState,
}

impl NewPayment {
    pub fn new(reservation_id: Uuid, amount: f64, method: PaymentMethod) -> Self {
        Self {
            reservation_id,
            amount,
            method,
            kind: PaymentKind::default(),
            currency: None,
            transaction_id: None,
            notes: None,
            status: PaymentState::Pending,
        }
    }
}

impl BookingEngine<'_> {
    /// Record a payment for a reservation that is not cancelled
    #[instrument(skip(self, req), fields(reservation_id = %req.reservation_id))]
    pub fn record_payment(&self, req: NewPayment) -> Result<Payment> {
        if !req.amount.is_finite() || req.amount <= 0.0 {
            return Err(Error::validation("Amount must be greater than zero"));
        }
        if !matches!(req.status, PaymentState::Pending | PaymentState::Completed) {
            return Err(Error::validation(
                "New payments must be pending or completed",
            ));
        }

        let tx = self.db.immediate()?;
        let reservation = ReservationStore::new(&tx).get(req.reservation_id)?;
        if reservation.status == ReservationStatus::Cancelled {
            return Err(Error::validation(
                "Cannot record payment for a cancelled reservation",
            ));
        }

        let mut payment = Payment::new(reservation.id, req.amount, req.method);
        payment.kind = req.kind;
        if let Some(currency) = req.currency.filter(|c| !c.trim().is_empty()) {
            payment.currency = currency.trim().to_uppercase();
        }
        payment.transaction_id = req.transaction_id;
        payment.notes = req.notes;
        if req.status == PaymentState::Completed {
            payment.apply_state(PaymentState::Completed, payment.created_at);
        }

        PaymentStore::new(&tx).create(&payment)?;
        let status = recompute(&tx, reservation.id)?;
        tx.commit()?;

        info!(
            payment_id = %payment.id,
            code = %payment.payment_code,
            amount = payment.amount,
            reservation_payment_status = status.as_str(),
            "Payment recorded"
        );
        Ok(payment)
    }

    /// Move a payment to `next`, stamping `paid_at`/`refunded_at`
    #[instrument(skip(self))]
    pub fn update_payment_status(&self, id: Uuid, next: PaymentState) -> Result<Payment> {
        self.change_payment(id, next, None)
    }

    /// Refund a completed payment
    #[instrument(skip(self, reason))]
    pub fn refund_payment(&self, id: Uuid, reason: Option<String>) -> Result<Payment> {
        self.change_payment(id, PaymentState::Refunded, reason)
    }

    /// Recalculate a reservation's `payment_status` from its payments
    pub fn refresh_payment_status(&self, reservation_id: Uuid) -> Result<PaymentStatus> {
        let tx = self.db.immediate()?;
        ReservationStore::new(&tx).get(reservation_id)?;
        let status = recompute(&tx, reservation_id)?;
        tx.commit()?;
        Ok(status)
    }

    fn change_payment(&self, id: Uuid, next: PaymentState, note: Option<String>) -> Result<Payment> {
        let tx = self.db.immediate()?;
        let store = PaymentStore::new(&tx);
        let mut payment = store.get(id)?;
        let from = payment.status;

        if !payment.apply_state(next, Utc::now()) {
            return Err(Error::validation(format!(
                "Cannot change payment from {from} to {next}"
            )));
        }
        if let Some(note) = note.filter(|n| !n.trim().is_empty()) {
            payment.notes = Some(match payment.notes.take() {
                Some(existing) => format!("{existing}\n{note}"),
                None => note,
            });
        }

        store.update_state(&payment)?;
        let status = recompute(&tx, payment.reservation_id)?;
        tx.commit()?;

        info!(
            payment_id = %id,
            %from,
            to = %next,
            reservation_payment_status = status.as_str(),
            "Payment status changed"
        );
        Ok(payment)
    }
}

/// `paid` once completed money covers the total, `refunded` when nothing
/// completed remains but something was refunded, else `pending`
pub(crate) fn derive_payment_status(total_amount: f64, completed: f64, refunded_count: u32) -> PaymentStatus {
    if completed > 0.0 && completed + CENT >= total_amount {
        PaymentStatus::Paid
    } else if completed <= 0.0 && refunded_count > 0 {
        PaymentStatus::Refunded
    } else {
        PaymentStatus::Pending
    }
}

pub(super) fn recompute(tx: &Transaction<'_>, reservation_id: Uuid) -> Result<PaymentStatus> {
    let reservations = ReservationStore::new(tx);
    let reservation = reservations.get(reservation_id)?;
    let totals = PaymentStore::new(tx).totals_for_reservation(reservation_id)?;
    let status = derive_payment_status(reservation.total_amount, totals.completed, totals.refunded_count);

    if status != reservation.payment_status {
        reservations.set_payment_status(reservation_id, status)?;
    }
    Ok(status)
}
