//! Quota reservation entities.

pub mod model;
pub mod permit;
pub mod status;

pub use model::{NewReservation, Reservation};
pub use permit::PermitNumber;
pub use status::ReservationStatus;
