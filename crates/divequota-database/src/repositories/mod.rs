//! PostgreSQL implementations of the store and directory traits.

pub mod reservation;
pub mod site;

pub use reservation::PgReservationStore;
pub use site::PgSiteDirectory;
