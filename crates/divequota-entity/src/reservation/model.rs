//! Reservation entity model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::permit::PermitNumber;
use super::status::ReservationStatus;

/// A durable record of divers booked against a site's daily quota.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    /// Store-assigned identifier.
    pub id: Uuid,
    /// Dive site code.
    pub site_code: String,
    /// Calendar day the quota applies to.
    pub quota_date: NaiveDate,
    /// Number of divers covered.
    pub diver_count: i32,
    /// Dive center that requested the permit.
    pub center_id: Uuid,
    /// Trip the reservation belongs to (owned by the booking flow).
    pub trip_id: Uuid,
    /// Lifecycle status.
    pub status: ReservationStatus,
    /// Authority permit number, set on approval.
    pub permit_number: Option<String>,
    /// Reason recorded on cancellation.
    pub reason: Option<String>,
    /// When the reservation was created.
    pub created_at: DateTime<Utc>,
    /// When the reservation last changed status.
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Diver count as an unsigned value.
    pub fn divers(&self) -> u32 {
        self.diver_count.max(0) as u32
    }

    /// The permit number, if the authority issued one.
    pub fn permit(&self) -> Option<PermitNumber> {
        self.permit_number.clone().map(PermitNumber::from)
    }

    /// Whether this reservation counts against the daily limit.
    pub fn holds_capacity(&self) -> bool {
        self.status.holds_capacity()
    }
}

/// Input for creating a `pending` reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReservation {
    /// Dive site code.
    pub site_code: String,
    /// Calendar day.
    pub quota_date: NaiveDate,
    /// Number of divers.
    pub diver_count: i32,
    /// Requesting dive center.
    pub center_id: Uuid,
    /// Linked trip.
    pub trip_id: Uuid,
}
