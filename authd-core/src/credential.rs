//! Credential digest computation and comparison
//!
//! Passwords are never stored. The stored value is a BLAKE3 key derivation
//! of the plaintext under a context string that folds in the binding
//! context (the immutable user id), so identical passwords under different
//! identities produce unrelated digests. Verification recomputes the digest
//! and compares in constant time.

use crate::AuthError;
use std::fmt;
use subtle::ConstantTimeEq;

/// Domain-separation prefix for credential derivation. Changing this
/// invalidates every stored digest.
const DERIVE_CONTEXT: &str = "authd 2025-08 credential digest v1";

/// Length of a credential digest in bytes
pub const DIGEST_LEN: usize = 32;

/// Compute the stored digest for a plaintext password.
///
/// `binding` must be the account's immutable identity. It is mixed into the
/// derivation context so two accounts with the same password never share a
/// digest. Pure and deterministic: the exact same call is made at
/// creation/update time and at authentication time.
pub fn hash_password(plaintext: &str, binding: &str) -> PasswordDigest {
    let context = format!("{} {}", DERIVE_CONTEXT, binding);
    PasswordDigest(blake3::derive_key(&context, plaintext.as_bytes()))
}

/// Non-reversible stored representation of a password
#[derive(Clone)]
pub struct PasswordDigest([u8; DIGEST_LEN]);

impl PasswordDigest {
    /// Reconstruct a digest from its stored hex form
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        if !s.is_ascii() || s.len() != DIGEST_LEN * 2 {
            return Err(AuthError::InvalidDigest(format!(
                "expected {} hex characters, got {} bytes",
                DIGEST_LEN * 2,
                s.len()
            )));
        }

        let mut bytes = [0u8; DIGEST_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &s[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| AuthError::InvalidDigest(format!("invalid hex at offset {}", i * 2)))?;
        }

        Ok(PasswordDigest(bytes))
    }

    /// Hex form for storage
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Constant-time equality against another digest
    pub fn matches(&self, other: &PasswordDigest) -> bool {
        self.0.ct_eq(&other.0).into()
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordDigest").finish_non_exhaustive()
    }
}

mod hex {
    use std::fmt::Write;

    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().fold(String::new(), |mut output, b| {
            let _ = write!(output, "{:02x}", b);
            output
        })
    }
}
