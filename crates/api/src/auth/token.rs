//! HS256 access-token verification.
//!
//! Tokens are compact JWS strings `<header>.<claims>.<signature>`, each segment
//! base64url-encoded without padding. Only `HS256` is accepted; the signature is
//! an HMAC-SHA256 over `<header>.<claims>` keyed with the shared secret.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Scheme prefix expected at the start of the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// The only signature algorithm accepted in the token header.
pub const ALGORITHM: &str = "HS256";

/// Errors produced while authenticating a request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header, or it does not start with `Bearer `.
    #[error("missing or malformed bearer token")]
    MissingOrMalformed,

    /// The token is malformed, wrongly signed, expired, or for another audience.
    #[error("token verification failed: {0}")]
    VerificationFailed(String),

    /// The token verified but carries no usable `sub` claim.
    #[error("token payload has no subject")]
    InvalidPayload,
}

impl AuthError {
    /// Message returned to the client. The detailed reason is only logged.
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::MissingOrMalformed => "Missing or invalid token",
            AuthError::VerificationFailed(_) => "Token verification failed",
            AuthError::InvalidPayload => "Invalid token payload",
        }
    }
}

fn failed(reason: impl Into<String>) -> AuthError {
    AuthError::VerificationFailed(reason.into())
}

#[derive(Deserialize)]
struct TokenHeader {
    alg: String,
}

/// Verifies bearer tokens against a pre-shared HS256 secret and audience.
///
/// Stateless: holds only the key and expected audience, so one instance is
/// shared by every request.
#[derive(Clone)]
pub struct TokenVerifier {
    key: Vec<u8>,
    audience: String,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("key", &"[REDACTED]")
            .field("audience", &self.audience)
            .finish()
    }
}

impl TokenVerifier {
    /// Create a verifier for tokens signed with `secret` and issued for `audience`.
    pub fn new(secret: impl AsRef<[u8]>, audience: impl Into<String>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
            audience: audience.into(),
        }
    }

    /// Verify a raw `Authorization` header value and return the token subject.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingOrMalformed`] if the header is absent or not `Bearer <token>`.
    /// - [`AuthError::VerificationFailed`] if the token does not verify.
    /// - [`AuthError::InvalidPayload`] if the verified claims lack a non-empty `sub`.
    pub fn verify_header(&self, header: Option<&str>) -> Result<String, AuthError> {
        let token = header
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .and_then(|rest| rest.split(' ').next())
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingOrMalformed)?;
        self.verify_token(token, unix_now())
    }

    /// Verify a bare token at time `now` (seconds since the Unix epoch).
    pub fn verify_token(&self, token: &str, now: u64) -> Result<String, AuthError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(failed("token must have exactly three segments"));
        };

        let header: TokenHeader = decode_segment(header_b64, "header")?;
        if header.alg != ALGORITHM {
            return Err(failed(format!("algorithm {} is not allowed", header.alg)));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| failed("signature is not valid base64url"))?;
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| failed("verification key rejected"))?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        // Constant-time comparison.
        mac.verify_slice(&signature)
            .map_err(|_| failed("signature verification failed"))?;

        let claims: Map<String, Value> = decode_segment(claims_b64, "claims")?;
        check_timestamps(&claims, now)?;
        check_audience(&claims, &self.audience)?;

        match claims.get("sub") {
            Some(Value::String(sub)) if !sub.is_empty() => Ok(sub.clone()),
            _ => Err(AuthError::InvalidPayload),
        }
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| failed(format!("{what} is not valid base64url")))?;
    serde_json::from_slice(&bytes).map_err(|e| failed(format!("{what} is not valid JSON: {e}")))
}

fn numeric_claim(claims: &Map<String, Value>, name: &str) -> Result<Option<f64>, AuthError> {
    match claims.get(name) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| failed(format!("{name} claim must be a number"))),
    }
}

/// `exp`, `nbf` and `iat` are optional; when present they must be numeric and
/// consistent with `now`. No leeway is applied.
fn check_timestamps(claims: &Map<String, Value>, now: u64) -> Result<(), AuthError> {
    let now = now as f64;
    if let Some(exp) = numeric_claim(claims, "exp")? {
        if exp <= now {
            return Err(failed("token has expired"));
        }
    }
    if let Some(nbf) = numeric_claim(claims, "nbf")? {
        if nbf > now {
            return Err(failed("token is not yet valid (nbf)"));
        }
    }
    if let Some(iat) = numeric_claim(claims, "iat")? {
        if iat > now {
            return Err(failed("token is not yet valid (iat)"));
        }
    }
    Ok(())
}

/// `aud` is required and may be a string or an array of strings.
fn check_audience(claims: &Map<String, Value>, expected: &str) -> Result<(), AuthError> {
    let matches = match claims.get("aud") {
        None => return Err(failed("token is missing the aud claim")),
        Some(Value::String(aud)) => aud == expected,
        Some(Value::Array(auds)) => {
            if auds.iter().any(|a| !a.is_string()) {
                return Err(failed("aud claim must contain only strings"));
            }
            auds.iter().any(|a| a.as_str() == Some(expected))
        }
        Some(_) => return Err(failed("aud claim must be a string or an array of strings")),
    };
    if matches {
        Ok(())
    } else {
        Err(failed("audience does not match"))
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
