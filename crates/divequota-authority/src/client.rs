//! Authority client trait and request/response types.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use divequota_core::result::AppResult;
use divequota_entity::reservation::PermitNumber;

/// Which kind of authority issued (or would issue) a permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityMode {
    /// Local simulation.
    Mock,
    /// The regulator's API.
    Live,
}

impl AuthorityMode {
    /// Whether `permit` was issued by an authority of this mode.
    pub fn issued(&self, permit: &PermitNumber) -> bool {
        match self {
            Self::Mock => permit.is_mock(),
            Self::Live => !permit.is_mock(),
        }
    }
}

/// A permit request for a reservation that already holds local capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermitRequest {
    /// Client reference; the local reservation id. Lets a later lookup
    /// find the permit if the response was lost.
    pub reference: Uuid,
    /// Dive site code.
    pub site_code: String,
    /// Calendar day.
    pub date: NaiveDate,
    /// Number of divers.
    pub diver_count: u32,
    /// Requesting dive center.
    pub center_id: Uuid,
    /// Linked trip.
    pub trip_id: Uuid,
}

/// Outcome of a permit request the authority actually answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermitDecision {
    /// The authority issued a permit.
    Approved {
        /// The external permit number.
        permit_number: PermitNumber,
    },
    /// The authority refused the request.
    Denied {
        /// Reason given by the authority.
        reason: String,
    },
}

/// The regulator's permit system.
///
/// Transport failures and timeouts are reported as
/// `ErrorKind::AuthorityUnavailable`; an explicit refusal is a
/// [`PermitDecision::Denied`], not an error.
#[async_trait]
pub trait AuthorityClient: Send + Sync + std::fmt::Debug {
    /// Which kind of authority this is.
    fn mode(&self) -> AuthorityMode;

    /// Request a permit. Not idempotent; callers must not retry blindly.
    async fn request_permit(&self, request: &PermitRequest) -> AppResult<PermitDecision>;

    /// Cancel a previously issued permit. Idempotent.
    async fn cancel_permit(&self, permit: &PermitNumber, reason: &str) -> AppResult<()>;

    /// Look up the permit issued for a client reference, if any. Idempotent.
    async fn lookup_permit(&self, reference: Uuid) -> AppResult<Option<PermitNumber>>;

    /// The authority's own used count for a site-date, when it exposes one.
    async fn reported_usage(&self, site_code: &str, date: NaiveDate) -> AppResult<Option<u32>>;
}
