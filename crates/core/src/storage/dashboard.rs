//! Operational dashboard queries

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use tracing::instrument;

use super::{PaymentStore, ReservationStore, RoomStore};
use crate::error::Result;
use crate::models::{PaymentState, ReservationDetails, ReservationStatus, RoomStatus};

#[derive(Debug, Clone, Serialize)]
pub struct RoomStatusCount {
    pub status: RoomStatus,
    pub count: u32,
}

/// Front-desk snapshot for one day
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub date: NaiveDate,
    pub total_rooms: u32,
    pub rooms_by_status: Vec<RoomStatusCount>,
    pub arrivals: Vec<ReservationDetails>,
    pub departures: Vec<ReservationDetails>,
    pub in_house: u32,
    pub pending_payments: u32,
}

pub struct DashboardStore<'a> {
    conn: &'a Connection,
}

impl<'a> DashboardStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(skip(self))]
    pub fn summary(&self, today: NaiveDate) -> Result<DashboardSummary> {
        let reservations = ReservationStore::new(self.conn);
        let rooms_by_status: Vec<RoomStatusCount> = RoomStore::new(self.conn)
            .count_by_status()?
            .into_iter()
            .map(|(status, count)| RoomStatusCount { status, count })
            .collect();

        Ok(DashboardSummary {
            date: today,
            total_rooms: rooms_by_status.iter().map(|c| c.count).sum(),
            rooms_by_status,
            arrivals: reservations.arrivals(today)?,
            departures: reservations.departures(today)?,
            in_house: reservations.count_by_status(ReservationStatus::CheckedIn)?,
            pending_payments: PaymentStore::new(self.conn).count_by_status(PaymentState::Pending)?,
        })
    }
}
