//! Bearer-token authentication.
//!
//! Every `/api/*` endpoint takes an [`AuthenticatedUser`] extractor, which runs
//! before body parsing and before any database access. The subject it yields
//! is the only user identity the handlers trust; ids in request bodies are
//! never consulted.

pub mod extractor;
pub mod token;

pub use extractor::AuthenticatedUser;
pub use token::{AuthError, TokenVerifier};
