//! In-memory implementations for single-node development and tests.

pub mod reservation;
pub mod site;

pub use reservation::MemoryReservationStore;
pub use site::MemorySiteDirectory;
