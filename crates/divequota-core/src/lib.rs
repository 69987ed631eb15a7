//! # divequota-core
//!
//! Core crate for DiveQuota. Contains configuration schemas, the cache
//! provider trait, quota date parsing, the retry helper used for
//! idempotent authority calls, and the unified error system.
//!
//! This crate has **no** internal dependencies on other DiveQuota crates.

pub mod config;
pub mod error;
pub mod result;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
