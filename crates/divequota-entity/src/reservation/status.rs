//! Reservation status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a reservation.
///
/// Rows are never deleted; they only move `pending -> approved`,
/// `pending -> cancelled` or `approved -> cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Committed locally, waiting for the authority.
    Pending,
    /// Confirmed by the authority; carries a permit number.
    Approved,
    /// Released, denied, or rolled back.
    Cancelled,
}

impl ReservationStatus {
    /// Whether the reservation holds capacity against the daily limit.
    pub fn holds_capacity(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    /// Whether the status is final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
