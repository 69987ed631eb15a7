//! Cache key builders for DiveQuota cache entries.

use chrono::NaiveDate;

/// Prefix applied to all DiveQuota cache keys.
const PREFIX: &str = "quota";

/// Cache key for the quota snapshot of a site-date.
pub fn quota_snapshot(site_code: &str, date: NaiveDate) -> String {
    format!("{PREFIX}:snapshot:{site_code}:{date}")
}

/// Pattern matching every cached snapshot of a site.
pub fn site_snapshot_pattern(site_code: &str) -> String {
    format!("{PREFIX}:snapshot:{site_code}:*")
}
