//! Convenience result type alias for DiveQuota.

use crate::error::AppError;

/// A specialized `Result` type for DiveQuota operations.
pub type AppResult<T> = Result<T, AppError>;
