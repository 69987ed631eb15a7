//! Shared value types.

pub mod date;

pub use date::{IntoQuotaDate, parse_quota_date};
