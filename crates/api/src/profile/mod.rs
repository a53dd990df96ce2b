//! User profile persistence.
//!
//! # Write path
//!
//! [`ProfileStore::upsert`] updates the name and number of an existing row and
//! falls back to an insert when no row matched. Password and the social-login
//! flag are only ever written by the insert, so later edits never reset them.
//!
//! Two first-time saves for the same subject can both miss on the update and
//! both try to insert. The primary key lets exactly one insert win; the loser
//! rolls back and reports [`UpsertOutcome::AlreadyExists`] instead of an error.

pub mod postgres;

pub use postgres::PgProfileStore;

use async_trait::async_trait;
use common::protocol::{UserProfile, UserProfileResponse};
use common::ServiceError;
use thiserror::Error;

/// Errors produced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A query, transaction, or pool operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for ServiceError {
    fn from(_: StoreError) -> Self {
        ServiceError::Storage("Database error".into())
    }
}

/// Result of a successful [`ProfileStore::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// An existing row had its name and number updated.
    Updated,
    /// A new row was inserted.
    Created,
    /// A concurrent request inserted the row first; nothing was written.
    AlreadyExists,
}

impl UpsertOutcome {
    /// Message returned to the client for this outcome.
    pub fn message(self) -> &'static str {
        match self {
            UpsertOutcome::Updated | UpsertOutcome::Created => "User saved successfully",
            UpsertOutcome::AlreadyExists => "User already exists",
        }
    }
}

/// The stored fields returned by [`ProfileStore::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub first_name: String,
    pub last_name: String,
    pub number: String,
    pub is_social_login: bool,
}

impl From<ProfileRecord> for UserProfileResponse {
    fn from(r: ProfileRecord) -> Self {
        Self {
            first_name: r.first_name,
            last_name: r.last_name,
            mobile_number: r.number,
            is_social_login: r.is_social_login,
        }
    }
}

/// Storage seam for user profiles, keyed by verified subject id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Update the profile for `subject`, inserting it if absent.
    async fn upsert(&self, subject: &str, profile: &UserProfile)
        -> Result<UpsertOutcome, StoreError>;

    /// Look up the profile for `subject`; `Ok(None)` when no row exists.
    async fn fetch(&self, subject: &str) -> Result<Option<ProfileRecord>, StoreError>;

    /// Round-trip to the database, used by the health check.
    async fn ping(&self) -> Result<(), StoreError>;
}
