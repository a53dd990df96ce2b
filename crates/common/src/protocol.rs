//! Request and response types exchanged with API clients.
//!
//! Profile payloads use the camelCase field names the web frontend sends;
//! quote payloads keep snake_case.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Profile endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /api/save-user`.
///
/// An absent, `null`, or empty `password` marks the account as a social login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub mobile_number: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl UserProfile {
    /// The password to persist, or `None` for social-login accounts.
    pub fn stored_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// `true` when the profile carries no password.
    pub fn is_social_login(&self) -> bool {
        self.stored_password().is_none()
    }
}

/// Response body for `POST /api/save-user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for `GET /api/user-profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileResponse {
    pub first_name: String,
    pub last_name: String,
    pub mobile_number: String,
    pub is_social_login: bool,
}

// ---------------------------------------------------------------------------
// Quote endpoint
// ---------------------------------------------------------------------------

/// Query parameters for `POST /api/calculate-quote`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Usable roof area in square feet.
    pub roof_area: f64,
    /// Monthly electricity bill in rupees.
    pub electricity_bill: f64,
    /// Installation location. Accepted but not priced yet.
    pub location: String,
}

/// Successful response body for `POST /api/calculate-quote`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub system_size_kw: f64,
    pub estimated_cost: f64,
    pub annual_savings: f64,
    /// Years until savings cover the installation cost.
    pub payback_period: f64,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"unauthorized"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.message())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether the database answered a ping.
    pub database_ready: bool,
}
