//! Persisted user record

use authd_core::{hash_password, AuthError, PasswordDigest, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user row as stored in the `users` partition.
///
/// `password_digest` is the hex form of the identity-bound credential
/// digest; the plaintext is hashed before the record is built and is
/// never part of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub password_digest: String,
    pub created_on: DateTime<Utc>,
    pub modified_on: DateTime<Utc>,
}

impl UserRecord {
    /// Build a fresh record, hashing the password bound to `id`
    pub fn new(id: &UserId, name: &str, password: &str) -> Self {
        let now = Utc::now();
        UserRecord {
            id: id.as_str().to_string(),
            name: name.to_string(),
            password_digest: hash_password(password, id.as_str()).to_hex(),
            created_on: now,
            modified_on: now,
        }
    }

    /// Replace name and password, refreshing the modification time
    pub fn apply_update(&mut self, id: &UserId, name: &str, password: &str) {
        self.name = name.to_string();
        self.password_digest = hash_password(password, id.as_str()).to_hex();
        self.modified_on = Utc::now();
    }

    /// Parse the stored digest back into its binary form
    pub fn digest(&self) -> authd_core::Result<PasswordDigest> {
        PasswordDigest::from_hex(&self.password_digest)
    }

    /// The record's identity as a validated id
    pub fn user_id(&self) -> authd_core::Result<UserId> {
        UserId::new(&self.id)
    }
}

/// Guard against a plaintext ever being persisted by mistake
pub(crate) fn ensure_digest_shape(record: &UserRecord) -> authd_core::Result<()> {
    record.digest().map(|_| ()).map_err(|_| {
        AuthError::InvalidDigest(format!("stored digest for '{}' is corrupt", record.id))
    })
}
