//! Credential check orchestration
//!
//! Composes the credential store (an external collaborator behind
//! [`CredentialSource`]), the digest recomputation, and token issuance.
//! A lookup miss and a digest mismatch produce the identical
//! `AuthInvalid` outcome: callers get no user-enumeration signal.

use crate::credential::{hash_password, PasswordDigest};
use crate::token::TokenAuthority;
use crate::types::UserId;
use crate::{AuthError, Result};
use std::time::Duration;

/// A stored credential as handed back by the persistence collaborator
#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub identity: UserId,
    pub digest: PasswordDigest,
}

/// Read-only credential lookup, implemented by the persistence layer.
///
/// `Ok(None)` is a lookup miss; errors are storage faults and are kept
/// distinct from the miss case so they surface as internal failures
/// rather than as `AuthInvalid`.
pub trait CredentialSource {
    fn lookup_credential(&self, identity: &UserId) -> Result<Option<StoredCredential>>;
}

/// Answers "is this id/password pair valid, and if so, mint a token"
#[derive(Clone)]
pub struct Authenticator<S> {
    source: S,
    tokens: TokenAuthority,
    token_ttl: Duration,
}

impl<S: CredentialSource> Authenticator<S> {
    pub fn new(source: S, tokens: TokenAuthority, token_ttl: Duration) -> Self {
        Authenticator {
            source,
            tokens,
            token_ttl,
        }
    }

    /// Check the supplied password against the stored credential and mint
    /// a token on success.
    ///
    /// Never decrypts anything: the digest is recomputed with the same
    /// identity binding used at creation time and compared in constant
    /// time. Performs no token verification.
    pub fn authenticate(&self, identity: &UserId, password: &str) -> Result<String> {
        let stored = match self.source.lookup_credential(identity)? {
            Some(stored) => stored,
            None => return Err(AuthError::AuthInvalid),
        };

        let supplied = hash_password(password, identity.as_str());
        if !supplied.matches(&stored.digest) {
            return Err(AuthError::AuthInvalid);
        }

        self.tokens.issue(identity, self.token_ttl)
    }

    /// Lifetime of tokens this authenticator mints
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }
}
