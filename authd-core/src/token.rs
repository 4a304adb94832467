//! Signed token issuance and verification
//!
//! Tokens are stateless bearer credentials: a claim set carrying the
//! subject identity plus issued-at/expiry instants, signed under the
//! active keypair. Verification runs a fixed sequence of checks and stops
//! at the first failure: structure, declared algorithm, signature, expiry.

use crate::keys::{KeyManager, KeySet, SignatureAlgorithm};
use crate::types::UserId;
use crate::{AuthError, Result};
use jwt_simple::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Tolerance wide enough to neutralize expiry during the signature-only
/// step, so an expired-but-tampered token reports `SignatureInvalid` and
/// expiry is enforced separately afterwards. Ten years.
const EXPIRY_NEUTRAL_TOLERANCE_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Claims recovered from a successfully verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Identity the token was issued for
    pub subject: String,
    /// Issuance instant, seconds since the Unix epoch
    pub issued_at: u64,
    /// Absolute expiry, seconds since the Unix epoch
    pub expires_at: u64,
}

/// Issues and verifies tokens against a [`KeyManager`]'s active pair
#[derive(Clone)]
pub struct TokenAuthority {
    keys: Arc<KeyManager>,
}

impl TokenAuthority {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        TokenAuthority { keys }
    }

    /// Mint a signed token for `subject`, expiring `ttl` from now.
    ///
    /// Fails with `NotInitialized` before the key manager has a pair, and
    /// with `Signing` if the signature operation itself fails. Two calls
    /// at different instants produce different tokens.
    pub fn issue(&self, subject: &UserId, ttl: Duration) -> Result<String> {
        let keys = self.keys.active()?;
        issue_with_key(&keys, subject, ttl)
    }

    /// Verify a token against the currently active verification key
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        let keys = self.keys.active()?;
        verify_with_key(token, keys.public_key(), keys.algorithm())
    }

    /// The key manager this authority signs with
    pub fn keys(&self) -> &Arc<KeyManager> {
        &self.keys
    }
}

/// Sign a token under an explicit key set
pub fn issue_with_key(keys: &KeySet, subject: &UserId, ttl: Duration) -> Result<String> {
    let validity = jwt_simple::prelude::Duration::from_secs(ttl.as_secs());
    let claims = Claims::create(validity).with_subject(subject.as_str());

    keys.key_pair()
        .sign(claims)
        .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Verify a token against an explicit public key and expected algorithm.
///
/// Checks run in order and the first failure wins:
/// structure (`MalformedToken`), declared algorithm (`AlgorithmMismatch`),
/// signature (`SignatureInvalid`), expiry (`TokenExpired`). A key that
/// does not correspond to the signing key fails at the signature step even
/// for a well-formed, unexpired token.
pub fn verify_with_key(
    token: &str,
    public_key: &RS256PublicKey,
    algorithm: SignatureAlgorithm,
) -> Result<TokenClaims> {
    let metadata = Token::decode_metadata(token).map_err(|_| AuthError::MalformedToken)?;

    let declared = metadata.algorithm();
    if declared != algorithm.as_str() {
        return Err(AuthError::AlgorithmMismatch {
            expected: algorithm.as_str().to_string(),
            found: declared.to_string(),
        });
    }

    let mut options = VerificationOptions::default();
    options.time_tolerance = Some(jwt_simple::prelude::Duration::from_secs(
        EXPIRY_NEUTRAL_TOLERANCE_SECS,
    ));
    let verified = public_key
        .verify_token::<NoCustomClaims>(token, Some(options))
        .map_err(|_| AuthError::SignatureInvalid)?;

    let issued_at = verified.issued_at.ok_or(AuthError::MalformedToken)?;
    let expires_at = verified.expires_at.ok_or(AuthError::MalformedToken)?;
    let subject = verified.subject.ok_or(AuthError::MalformedToken)?;

    let now = Clock::now_since_epoch();
    if expires_at.as_secs() <= now.as_secs() {
        return Err(AuthError::TokenExpired);
    }

    Ok(TokenClaims {
        subject,
        issued_at: issued_at.as_secs(),
        expires_at: expires_at.as_secs(),
    })
}
