//! Payment storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{classify, parse_datetime, parse_datetime_opt, parse_enum, parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{Payment, PaymentFilter, PaymentKind, PaymentMethod, PaymentState};

const PAYMENT_COLUMNS: &str = "id, payment_code, reservation_id, amount, method, kind, currency, \
     transaction_id, notes, status, paid_at, refunded_at, created_at, updated_at";

fn row_to_payment(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        payment_code: row.get(1)?,
        reservation_id: parse_uuid(&row.get::<_, String>(2)?)?,
        amount: row.get(3)?,
        method: parse_enum(&row.get::<_, String>(4)?, "payment method", PaymentMethod::parse)?,
        kind: parse_enum(&row.get::<_, String>(5)?, "payment type", PaymentKind::parse)?,
        currency: row.get(6)?,
        transaction_id: row.get(7)?,
        notes: row.get(8)?,
        status: parse_enum(&row.get::<_, String>(9)?, "payment status", PaymentState::parse)?,
        paid_at: parse_datetime_opt(row.get(10)?)?,
        refunded_at: parse_datetime_opt(row.get(11)?)?,
        created_at: parse_datetime(&row.get::<_, String>(12)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(13)?)?,
    })
}

/// Money settled against one reservation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaymentTotals {
    pub completed: f64,
    pub refunded_count: u32,
}

pub struct PaymentStore<'a> {
    conn: &'a Connection,
}

impl<'a> PaymentStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(skip(self, payment), fields(payment_id = %payment.id, reservation_id = %payment.reservation_id))]
    pub fn create(&self, payment: &Payment) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO payments (id, payment_code, reservation_id, amount, method, kind, currency,
                    transaction_id, notes, status, paid_at, refunded_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    payment.id.to_string(),
                    payment.payment_code,
                    payment.reservation_id.to_string(),
                    payment.amount,
                    payment.method.as_str(),
                    payment.kind.as_str(),
                    payment.currency,
                    payment.transaction_id,
                    payment.notes,
                    payment.status.as_str(),
                    payment.paid_at.map(|t| t.to_rfc3339()),
                    payment.refunded_at.map(|t| t.to_rfc3339()),
                    payment.created_at.to_rfc3339(),
                    payment.updated_at.to_rfc3339(),
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1");
        let payment = self
            .conn
            .query_row(&sql, params![id.to_string()], row_to_payment)
            .optional()?;
        Ok(payment)
    }

    pub fn get(&self, id: Uuid) -> Result<Payment> {
        self.find_by_id(id)?
            .ok_or_else(|| Error::not_found("Payment", id))
    }

    #[instrument(skip(self, filter))]
    pub fn list(&self, filter: &PaymentFilter) -> Result<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments
             WHERE (?1 IS NULL OR reservation_id = ?1)
               AND (?2 IS NULL OR status = ?2)
               AND (?3 IS NULL OR method = ?3)
             ORDER BY created_at DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let payments = stmt
            .query_map(
                params![
                    filter.reservation_id.map(|id| id.to_string()),
                    filter.status.map(|s| s.as_str()),
                    filter.method.map(|m| m.as_str()),
                ],
                row_to_payment,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(payments)
    }

    /// Persist status, timestamps and notes of an existing payment
    #[instrument(skip(self, payment), fields(payment_id = %payment.id, status = payment.status.as_str()))]
    pub fn update_state(&self, payment: &Payment) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE payments SET status = ?1, paid_at = ?2, refunded_at = ?3, notes = ?4,
                transaction_id = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                payment.status.as_str(),
                payment.paid_at.map(|t| t.to_rfc3339()),
                payment.refunded_at.map(|t| t.to_rfc3339()),
                payment.notes,
                payment.transaction_id,
                payment.updated_at.to_rfc3339(),
                payment.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found("Payment", payment.id));
        }
        Ok(())
    }

    pub fn totals_for_reservation(&self, reservation_id: Uuid) -> Result<PaymentTotals> {
        let totals = self.conn.query_row(
            "SELECT COALESCE(SUM(CASE WHEN status = 'completed' THEN amount ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'refunded' THEN 1 ELSE 0 END), 0)
             FROM payments WHERE reservation_id = ?1",
            params![reservation_id.to_string()],
            |row| {
                Ok(PaymentTotals {
                    completed: row.get(0)?,
                    refunded_count: row.get(1)?,
                })
            },
        )?;
        Ok(totals)
    }

    pub fn count_by_status(&self, status: PaymentState) -> Result<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM payments WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
