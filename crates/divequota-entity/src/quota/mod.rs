//! Derived quota value objects. None of these are persisted by the engine.

pub mod alternative;
pub mod fee;
pub mod forecast;
pub mod snapshot;

pub use alternative::AlternativeSite;
pub use fee::ConservationFeeResult;
pub use forecast::{ForecastPoint, ForecastStatus};
pub use snapshot::QuotaSnapshot;
