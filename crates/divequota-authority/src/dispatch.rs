//! Authority adapter selected once from configuration.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use divequota_core::config::SrsaConfig;
use divequota_core::result::AppResult;
use divequota_entity::reservation::PermitNumber;

use crate::client::{AuthorityClient, AuthorityMode, PermitDecision, PermitRequest};
use crate::live::LiveAuthorityClient;
use crate::mock::MockAuthorityClient;

/// Dispatcher over the authority adapters.
///
/// Switches between the mock and the live regulator API based on
/// `srsa.use_mock`.
#[derive(Debug)]
pub enum AuthorityDispatch {
    /// In-process simulation.
    Mock(MockAuthorityClient),
    /// Regulator HTTP API.
    Live(LiveAuthorityClient),
}

impl AuthorityDispatch {
    /// Build the adapter the configuration asks for.
    pub fn from_config(config: &SrsaConfig) -> AppResult<Self> {
        if config.use_mock {
            info!("Using mock SRSA authority");
            Ok(Self::Mock(MockAuthorityClient::new()))
        } else {
            info!(api_url = %config.api_url, "Using live SRSA authority");
            Ok(Self::Live(LiveAuthorityClient::new(config)?))
        }
    }
}

#[async_trait]
impl AuthorityClient for AuthorityDispatch {
    fn mode(&self) -> AuthorityMode {
        match self {
            Self::Mock(inner) => inner.mode(),
            Self::Live(inner) => inner.mode(),
        }
    }

    async fn request_permit(&self, request: &PermitRequest) -> AppResult<PermitDecision> {
        match self {
            Self::Mock(inner) => inner.request_permit(request).await,
            Self::Live(inner) => inner.request_permit(request).await,
        }
    }

    async fn cancel_permit(&self, permit: &PermitNumber, reason: &str) -> AppResult<()> {
        match self {
            Self::Mock(inner) => inner.cancel_permit(permit, reason).await,
            Self::Live(inner) => inner.cancel_permit(permit, reason).await,
        }
    }

    async fn lookup_permit(&self, reference: Uuid) -> AppResult<Option<PermitNumber>> {
        match self {
            Self::Mock(inner) => inner.lookup_permit(reference).await,
            Self::Live(inner) => inner.lookup_permit(reference).await,
        }
    }

    async fn reported_usage(&self, site_code: &str, date: NaiveDate) -> AppResult<Option<u32>> {
        match self {
            Self::Mock(inner) => inner.reported_usage(site_code, date).await,
            Self::Live(inner) => inner.reported_usage(site_code, date).await,
        }
    }
}
