//! External permit numbers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix shared by every permit number.
const PERMIT_PREFIX: &str = "SRSA-";

/// Marker placed after the prefix on permits issued by the mock authority.
const MOCK_MARKER: &str = "MOCK-";

/// Opaque permit identifier issued by the authority.
///
/// Mock-issued permits are visibly distinguishable from live ones so the
/// two environments cannot be mixed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermitNumber(String);

impl PermitNumber {
    /// Wrap a permit number received from the authority.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh mock permit number (`SRSA-MOCK-XXXXXXXXXX`).
    pub fn generate_mock() -> Self {
        let random = Uuid::new_v4().simple().to_string().to_uppercase();
        Self(format!("{PERMIT_PREFIX}{MOCK_MARKER}{}", &random[..10]))
    }

    /// Whether this permit was issued by the mock authority.
    pub fn is_mock(&self) -> bool {
        self.0
            .strip_prefix(PERMIT_PREFIX)
            .is_some_and(|rest| rest.starts_with(MOCK_MARKER))
    }

    /// Return the permit number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermitNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PermitNumber {
    fn from(value: String) -> Self {
        Self(value)
    }
}
