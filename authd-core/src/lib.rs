//! Core authentication and token-trust logic for authd
//!
//! This crate implements the security plane with:
//! - Salted, identity-bound credential digests (recompute-and-compare)
//! - RS256 key lifecycle management with atomic rotation
//! - Signed token issuance and ordered verification
//! - Constant-time credential comparison

pub mod authenticator;
pub mod credential;
pub mod error;
pub mod keys;
pub mod token;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testutil;

pub use authenticator::*;
pub use credential::*;
pub use error::*;
pub use keys::*;
pub use token::*;
pub use types::*;

/// Result type alias for authd operations
pub type Result<T> = std::result::Result<T, AuthError>;
