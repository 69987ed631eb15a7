//! Mock authority for development and testing.
//!
//! Simulates the regulator in-process: permits are synthesized locally
//! and, by default, every request is approved immediately.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use divequota_core::error::AppError;
use divequota_core::result::AppResult;
use divequota_entity::reservation::PermitNumber;

use crate::client::{AuthorityClient, AuthorityMode, PermitDecision, PermitRequest};

/// How the mock answers permit requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MockBehavior {
    /// Issue a `SRSA-MOCK-` permit for every request.
    #[default]
    Approve,
    /// Refuse every request with the given reason.
    Deny(String),
    /// Fail every call as if the authority were unreachable.
    Unavailable,
}

/// In-process stand-in for the regulator.
#[derive(Debug, Default)]
pub struct MockAuthorityClient {
    behavior: RwLock<MockBehavior>,
    /// Issued permits keyed by client reference.
    issued: DashMap<Uuid, PermitNumber>,
    /// Cancelled permits with the reason given.
    cancelled: DashMap<PermitNumber, String>,
}

impl MockAuthorityClient {
    /// Create a mock that approves everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with a fixed behavior.
    pub fn with_behavior(behavior: MockBehavior) -> Self {
        let mock = Self::new();
        mock.set_behavior(behavior);
        mock
    }

    /// Change how subsequent calls are answered.
    pub fn set_behavior(&self, behavior: MockBehavior) {
        let mut current = self.behavior.write().unwrap_or_else(|e| e.into_inner());
        *current = behavior;
    }

    fn behavior(&self) -> MockBehavior {
        self.behavior
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn check_available(&self) -> AppResult<()> {
        if self.behavior() == MockBehavior::Unavailable {
            return Err(AppError::authority_unavailable(
                "Mock authority configured as unavailable",
            ));
        }
        Ok(())
    }

    /// Number of permits issued so far.
    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    /// Reason recorded when `permit` was cancelled, if it was.
    pub fn cancellation_reason(&self, permit: &PermitNumber) -> Option<String> {
        self.cancelled.get(permit).map(|r| r.value().clone())
    }

    /// Number of cancellations received.
    pub fn cancelled_count(&self) -> usize {
        self.cancelled.len()
    }
}

#[async_trait]
impl AuthorityClient for MockAuthorityClient {
    fn mode(&self) -> AuthorityMode {
        AuthorityMode::Mock
    }

    async fn request_permit(&self, request: &PermitRequest) -> AppResult<PermitDecision> {
        match self.behavior() {
            MockBehavior::Approve => {
                // Same reference, same permit.
                let permit = self
                    .issued
                    .entry(request.reference)
                    .or_insert_with(PermitNumber::generate_mock)
                    .value()
                    .clone();
                info!(
                    reservation_id = %request.reference,
                    site_code = %request.site_code,
                    date = %request.date,
                    diver_count = request.diver_count,
                    permit_number = %permit,
                    "[MockSRSA] Permit issued"
                );
                Ok(PermitDecision::Approved {
                    permit_number: permit,
                })
            }
            MockBehavior::Deny(reason) => {
                warn!(
                    reservation_id = %request.reference,
                    site_code = %request.site_code,
                    reason = %reason,
                    "[MockSRSA] Permit denied"
                );
                Ok(PermitDecision::Denied { reason })
            }
            MockBehavior::Unavailable => Err(AppError::authority_unavailable(
                "Mock authority configured as unavailable",
            )),
        }
    }

    async fn cancel_permit(&self, permit: &PermitNumber, reason: &str) -> AppResult<()> {
        self.check_available()?;
        self.cancelled
            .entry(permit.clone())
            .or_insert_with(|| reason.to_string());
        info!(permit_number = %permit, reason, "[MockSRSA] Permit cancelled");
        Ok(())
    }

    async fn lookup_permit(&self, reference: Uuid) -> AppResult<Option<PermitNumber>> {
        self.check_available()?;
        Ok(self.issued.get(&reference).map(|p| p.value().clone()))
    }

    async fn reported_usage(&self, _site_code: &str, _date: NaiveDate) -> AppResult<Option<u32>> {
        // The mock keeps no independent ledger.
        Ok(None)
    }
}
