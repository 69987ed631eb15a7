//! # divequota-entity
//!
//! Domain entity models for DiveQuota. Structs here are either database
//! rows (`sqlx::FromRow`) or derived, non-persistent value objects
//! produced by the quota engine.

pub mod quota;
pub mod reservation;
pub mod site;

pub use quota::{
    AlternativeSite, ConservationFeeResult, ForecastPoint, ForecastStatus, QuotaSnapshot,
};
pub use reservation::{NewReservation, PermitNumber, Reservation, ReservationStatus};
pub use site::{ConservationZone, NearbySite, SiteQuotaConfig};
