//! # divequota-database
//!
//! The persistent reservation store and the read-only site directory.
//! PostgreSQL implementations back production deployments; in-memory
//! implementations serve single-node development and tests.

pub mod connection;
pub mod directory;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use directory::SiteDirectory;
pub use memory::{MemoryReservationStore, MemorySiteDirectory};
pub use repositories::{PgReservationStore, PgSiteDirectory};
pub use store::ReservationStore;
