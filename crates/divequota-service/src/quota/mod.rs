//! Quota allocation engine.

pub mod cache;
pub mod engine;
pub mod forecast;
pub mod reconcile;
pub mod reservation;

pub use cache::QuotaCache;
pub use engine::QuotaEngine;
pub use reconcile::SweepReport;
