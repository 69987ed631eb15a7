//! Quota date parsing.
//!
//! Quota is partitioned per calendar day. Callers pass dates as ISO-8601
//! strings; a full timestamp is accepted and truncated to its date part.

use chrono::{DateTime, NaiveDate};

use crate::error::AppError;
use crate::result::AppResult;

/// Parse a quota date, accepting `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_quota_date(input: &str) -> AppResult<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|ts| ts.date_naive())
        .map_err(|_| AppError::validation(format!("Invalid quota date: '{input}'")))
}

/// Values accepted wherever a quota date is expected.
///
/// Typed callers pass a [`NaiveDate`]; callers holding raw input pass a
/// string and get a `Validation` error if it does not parse.
pub trait IntoQuotaDate {
    /// Resolve to a calendar day.
    fn into_quota_date(self) -> AppResult<NaiveDate>;
}

impl IntoQuotaDate for NaiveDate {
    fn into_quota_date(self) -> AppResult<NaiveDate> {
        Ok(self)
    }
}

impl IntoQuotaDate for &str {
    fn into_quota_date(self) -> AppResult<NaiveDate> {
        parse_quota_date(self)
    }
}

impl IntoQuotaDate for &String {
    fn into_quota_date(self) -> AppResult<NaiveDate> {
        parse_quota_date(self)
    }
}

impl IntoQuotaDate for String {
    fn into_quota_date(self) -> AppResult<NaiveDate> {
        parse_quota_date(&self)
    }
}
