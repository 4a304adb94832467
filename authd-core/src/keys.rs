//! RS256 key lifecycle management
//!
//! The [`KeyManager`] owns the active signing/verification pair. It starts
//! uninitialized; a successful [`KeyManager::initialize`] parses both PEM
//! inputs and atomically swaps in a complete [`KeySet`]. Readers take an
//! `Arc` snapshot, so a concurrent re-initialization can never expose a
//! half-updated pair.

use crate::{AuthError, Result};
use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Signature scheme used for token issuance and verification.
///
/// Carried inside the active [`KeySet`] so both paths always agree on the
/// scheme, and algorithm-confusion checks compare against this rather than
/// a free-form string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    #[default]
    Rs256,
}

impl SignatureAlgorithm {
    /// Wire identifier as it appears in a token header
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Rs256 => "RS256",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable signing/verification pair snapshot.
///
/// The private and public halves are loaded independently and are not
/// checked against each other: rotation semantics rely on being able to
/// hold an arbitrary (private, public) combination, and a mismatched pair
/// simply fails signature verification downstream.
pub struct KeySet {
    key_pair: RS256KeyPair,
    public_key: RS256PublicKey,
    public_key_pem: String,
    algorithm: SignatureAlgorithm,
}

impl KeySet {
    /// Parse a key set from PEM-encoded private and public key material
    pub fn from_pem(
        private_pem: &str,
        public_pem: &str,
        algorithm: SignatureAlgorithm,
    ) -> Result<Self> {
        let key_pair = RS256KeyPair::from_pem(private_pem)
            .map_err(|e| AuthError::KeyLoad(format!("private key: {}", e)))?;
        let public_key = RS256PublicKey::from_pem(public_pem)
            .map_err(|e| AuthError::KeyLoad(format!("public key: {}", e)))?;

        Ok(KeySet {
            key_pair,
            public_key,
            public_key_pem: public_pem.to_string(),
            algorithm,
        })
    }

    /// The private signing key (sensitive; never serialized)
    pub fn key_pair(&self) -> &RS256KeyPair {
        &self.key_pair
    }

    /// The verification key
    pub fn public_key(&self) -> &RS256PublicKey {
        &self.public_key
    }

    /// The verification key exactly as it was supplied, safe to expose
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// The signature scheme this pair is used with
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Owns the process's active keypair.
///
/// Injectable component: constructed once at startup, shared behind an
/// `Arc`, and handed to whatever needs to sign or verify. Not a global.
pub struct KeyManager {
    active: RwLock<Option<Arc<KeySet>>>,
    algorithm: SignatureAlgorithm,
}

impl KeyManager {
    /// Create an uninitialized manager for the given algorithm
    pub fn new(algorithm: SignatureAlgorithm) -> Self {
        KeyManager {
            active: RwLock::new(None),
            algorithm,
        }
    }

    /// Load a keypair from PEM text, replacing any previously active pair.
    ///
    /// Both inputs are parsed before anything is swapped: a failure leaves
    /// the previously active pair (or the uninitialized state) untouched.
    pub fn initialize(&self, private_pem: &str, public_pem: &str) -> Result<()> {
        let set = Arc::new(KeySet::from_pem(private_pem, public_pem, self.algorithm)?);

        let mut active = self.active.write().expect("key manager lock poisoned");
        *active = Some(set);
        Ok(())
    }

    /// Load a keypair from two PEM files
    pub fn initialize_from_files(&self, private_path: &Path, public_path: &Path) -> Result<()> {
        let private_pem = std::fs::read_to_string(private_path)
            .map_err(|e| AuthError::KeyLoad(format!("reading {}: {}", private_path.display(), e)))?;
        let public_pem = std::fs::read_to_string(public_path)
            .map_err(|e| AuthError::KeyLoad(format!("reading {}: {}", public_path.display(), e)))?;

        self.initialize(&private_pem, &public_pem)
    }

    /// Whether a keypair has been successfully loaded
    pub fn is_initialized(&self) -> bool {
        self.active
            .read()
            .expect("key manager lock poisoned")
            .is_some()
    }

    /// Snapshot of the active key set.
    ///
    /// The snapshot stays valid for the caller even if the manager is
    /// re-initialized concurrently.
    pub fn active(&self) -> Result<Arc<KeySet>> {
        self.active
            .read()
            .expect("key manager lock poisoned")
            .clone()
            .ok_or(AuthError::NotInitialized)
    }

    /// The active verification key as PEM text, verbatim as loaded
    pub fn verification_key_pem(&self) -> Result<String> {
        Ok(self.active()?.public_key_pem().to_string())
    }

    /// The configured signature scheme
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("algorithm", &self.algorithm)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
