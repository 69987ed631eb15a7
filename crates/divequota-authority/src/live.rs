//! HTTP adapter for the regulator permit API.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use divequota_core::config::SrsaConfig;
use divequota_core::error::{AppError, ErrorKind};
use divequota_core::result::AppResult;
use divequota_entity::reservation::PermitNumber;

use crate::client::{AuthorityClient, AuthorityMode, PermitDecision, PermitRequest};

const API_KEY_HEADER: &str = "X-Api-Key";
const API_SECRET_HEADER: &str = "X-Api-Secret";

/// Client for the regulator's permit API.
#[derive(Debug, Clone)]
pub struct LiveAuthorityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct PermitResponse {
    status: String,
    permit_number: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    permit_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    used: u32,
}

#[derive(Debug, Serialize)]
struct CancelBody<'a> {
    reason: &'a str,
}

/// How a response status should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Success,
    NotFound,
    Refused,
    Unavailable,
}

fn classify_status(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status == StatusCode::NOT_FOUND {
        StatusClass::NotFound
    } else if status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY {
        StatusClass::Refused
    } else {
        // 401/403 mean our credentials are wrong; 429/5xx are transient.
        StatusClass::Unavailable
    }
}

fn transport_error(context: &str, e: reqwest::Error) -> AppError {
    let message = if e.is_timeout() {
        format!("{context}: regulator request timed out")
    } else {
        format!("{context}: {e}")
    };
    AppError::with_source(ErrorKind::AuthorityUnavailable, message, e)
}

fn unexpected_status(context: &str, status: StatusCode) -> AppError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        error!(%status, "Regulator rejected our credentials");
    }
    AppError::authority_unavailable(format!("{context}: regulator returned {status}"))
}

impl LiveAuthorityClient {
    /// Build a client from the SRSA configuration.
    pub fn new(config: &SrsaConfig) -> AppResult<Self> {
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(AppError::configuration(
                "srsa.api_key and srsa.api_secret are required when use_mock is false",
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_SECRET_HEADER, &self.api_secret)
    }
}

#[async_trait]
impl AuthorityClient for LiveAuthorityClient {
    fn mode(&self) -> AuthorityMode {
        AuthorityMode::Live
    }

    async fn request_permit(&self, request: &PermitRequest) -> AppResult<PermitDecision> {
        debug!(
            reservation_id = %request.reference,
            site_code = %request.site_code,
            date = %request.date,
            diver_count = request.diver_count,
            "Requesting permit from regulator"
        );

        let response = self
            .authed(self.http.post(self.url("/permits")))
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("Permit request failed", e))?;

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success | StatusClass::Refused => {
                let body: PermitResponse = response
                    .json()
                    .await
                    .map_err(|e| transport_error("Malformed permit response", e))?;
                match (body.status.as_str(), body.permit_number) {
                    ("approved", Some(number)) => Ok(PermitDecision::Approved {
                        permit_number: PermitNumber::new(number),
                    }),
                    ("approved", None) => Err(AppError::authority_unavailable(
                        "Regulator approved without a permit number",
                    )),
                    _ => Ok(PermitDecision::Denied {
                        reason: body
                            .reason
                            .unwrap_or_else(|| format!("regulator returned {status}")),
                    }),
                }
            }
            StatusClass::NotFound | StatusClass::Unavailable => {
                Err(unexpected_status("Permit request failed", status))
            }
        }
    }

    async fn cancel_permit(&self, permit: &PermitNumber, reason: &str) -> AppResult<()> {
        let response = self
            .authed(
                self.http
                    .post(self.url(&format!("/permits/{}/cancel", permit.as_str()))),
            )
            .json(&CancelBody { reason })
            .send()
            .await
            .map_err(|e| transport_error("Permit cancellation failed", e))?;

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success => Ok(()),
            StatusClass::NotFound | StatusClass::Refused => {
                // Unknown or already cancelled on their side.
                warn!(permit_number = %permit, %status, "Regulator had nothing to cancel");
                Ok(())
            }
            StatusClass::Unavailable => {
                Err(unexpected_status("Permit cancellation failed", status))
            }
        }
    }

    async fn lookup_permit(&self, reference: Uuid) -> AppResult<Option<PermitNumber>> {
        let response = self
            .authed(self.http.get(self.url(&format!("/permits?reference={reference}"))))
            .send()
            .await
            .map_err(|e| transport_error("Permit lookup failed", e))?;

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success => {
                let body: LookupResponse = response
                    .json()
                    .await
                    .map_err(|e| transport_error("Malformed lookup response", e))?;
                Ok(body.permit_number.map(PermitNumber::new))
            }
            StatusClass::NotFound => Ok(None),
            StatusClass::Refused | StatusClass::Unavailable => {
                Err(unexpected_status("Permit lookup failed", status))
            }
        }
    }

    async fn reported_usage(&self, site_code: &str, date: NaiveDate) -> AppResult<Option<u32>> {
        let response = self
            .authed(self.http.get(self.url(&format!("/quotas/{site_code}/{date}"))))
            .send()
            .await
            .map_err(|e| transport_error("Usage lookup failed", e))?;

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success => {
                let body: UsageResponse = response
                    .json()
                    .await
                    .map_err(|e| transport_error("Malformed usage response", e))?;
                Ok(Some(body.used))
            }
            StatusClass::NotFound => Ok(None),
            StatusClass::Refused | StatusClass::Unavailable => {
                Err(unexpected_status("Usage lookup failed", status))
            }
        }
    }
}
