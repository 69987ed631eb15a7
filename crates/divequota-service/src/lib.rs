//! # divequota-service
//!
//! The site quota allocation engine. [`QuotaEngine`] orchestrates the
//! snapshot cache, the transactional reservation store and the regulator
//! authority; [`PendingReservationSweeper`] resolves reservations left
//! `pending` by a crash between the store commit and the authority reply.

pub mod fee;
pub mod quota;
pub mod sweeper;

pub use fee::FeeTable;
pub use quota::{QuotaCache, QuotaEngine, SweepReport};
pub use sweeper::PendingReservationSweeper;
