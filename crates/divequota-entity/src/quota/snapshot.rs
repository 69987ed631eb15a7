//! Quota snapshot cached per site and date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of a site's quota for one day.
///
/// Never authoritative: reservations re-verify against the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    /// Dive site code.
    pub site_code: String,
    /// Calendar day.
    pub date: NaiveDate,
    /// Daily diver limit.
    pub daily_limit: u32,
    /// Divers already counted against the limit.
    pub used: u32,
    /// `daily_limit - used`, floored at zero.
    pub remaining: u32,
    /// Whether `remaining` covers the diver count of the current request.
    pub available: bool,
    /// When the figures were computed.
    pub refreshed_at: DateTime<Utc>,
}

impl QuotaSnapshot {
    /// Build a fresh snapshot from a limit and a used total.
    pub fn compute(site_code: &str, date: NaiveDate, daily_limit: u32, used: u32) -> Self {
        Self {
            site_code: site_code.to_string(),
            date,
            daily_limit,
            used,
            remaining: daily_limit.saturating_sub(used),
            available: used < daily_limit,
            refreshed_at: Utc::now(),
        }
    }

    /// Annotate the snapshot for a request of `diver_count` divers.
    pub fn for_request(mut self, diver_count: u32) -> Self {
        self.available = self.remaining >= diver_count;
        self
    }

    /// Whether the snapshot is younger than `ttl`.
    pub fn is_fresh(&self, ttl: chrono::Duration) -> bool {
        Utc::now() - self.refreshed_at < ttl
    }
}
