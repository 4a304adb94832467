//! fjall-backed user store

use crate::record::{ensure_digest_shape, UserRecord};
use authd_core::{AuthError, CredentialSource, Result, StoredCredential, UserId};
use fjall::{Config, Keyspace, Partition, PartitionCreateOptions, PersistMode};
use std::path::Path;
use std::sync::Arc;

const USERS_PARTITION: &str = "users";

/// User-record store over a fjall keyspace
#[derive(Clone)]
pub struct UserStore {
    keyspace: Arc<Keyspace>,
    users: Arc<Partition>,
}

impl UserStore {
    /// Open (or create) the store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let keyspace = Arc::new(
            Config::new(path)
                .open()
                .map_err(|e| AuthError::Storage(e.to_string()))?,
        );

        let users = Arc::new(
            keyspace
                .open_partition(USERS_PARTITION, PartitionCreateOptions::default())
                .map_err(|e| AuthError::Storage(e.to_string()))?,
        );

        Ok(UserStore { keyspace, users })
    }

    /// Create a temporary store for testing
    #[cfg(any(test, feature = "test-utils"))]
    pub fn temp() -> Result<(Self, tempfile::TempDir)> {
        let temp_dir = tempfile::tempdir().map_err(|e| AuthError::Storage(e.to_string()))?;
        let store = Self::open(temp_dir.path())?;
        Ok((store, temp_dir))
    }

    /// Insert a new user; the password is hashed bound to `id` before it
    /// is stored
    pub fn create_user(&self, id: &UserId, name: &str, password: &str) -> Result<UserRecord> {
        if self.get(id)?.is_some() {
            return Err(AuthError::UserAlreadyExists {
                id: id.as_str().to_string(),
            });
        }

        let record = UserRecord::new(id, name, password);
        self.put(&record)?;
        Ok(record)
    }

    /// Fetch a user by id
    pub fn lookup_user(&self, id: &UserId) -> Result<UserRecord> {
        self.get(id)?.ok_or_else(|| AuthError::UserNotFound {
            id: id.as_str().to_string(),
        })
    }

    /// Replace name and password of an existing user
    pub fn update_user(&self, id: &UserId, name: &str, password: &str) -> Result<UserRecord> {
        let mut record = self.lookup_user(id)?;
        record.apply_update(id, name, password);
        self.put(&record)?;
        Ok(record)
    }

    /// Remove a user by id
    pub fn delete_user(&self, id: &UserId) -> Result<()> {
        if self.get(id)?.is_none() {
            return Err(AuthError::UserNotFound {
                id: id.as_str().to_string(),
            });
        }

        self.users
            .remove(id.as_str())
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        self.persist()
    }

    /// All users, ordered by id
    pub fn list_users(&self) -> Result<Vec<UserRecord>> {
        let mut records = Vec::new();
        for entry in self.users.iter() {
            let (_key, value) = entry.map_err(|e| AuthError::Storage(e.to_string()))?;
            let record: UserRecord =
                serde_json::from_slice(&value).map_err(AuthError::Serialization)?;
            records.push(record);
        }
        Ok(records)
    }

    /// Number of stored users
    pub fn user_count(&self) -> Result<usize> {
        Ok(self.list_users()?.len())
    }

    // Private helpers

    fn get(&self, id: &UserId) -> Result<Option<UserRecord>> {
        match self.users.get(id.as_str()) {
            Ok(Some(value)) => {
                let record: UserRecord =
                    serde_json::from_slice(&value).map_err(AuthError::Serialization)?;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(AuthError::Storage(e.to_string())),
        }
    }

    fn put(&self, record: &UserRecord) -> Result<()> {
        ensure_digest_shape(record)?;
        let encoded = serde_json::to_vec(record).map_err(AuthError::Serialization)?;

        self.users
            .insert(&record.id, encoded)
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .map_err(|e| AuthError::Storage(e.to_string()))
    }
}

impl CredentialSource for UserStore {
    fn lookup_credential(&self, identity: &UserId) -> Result<Option<StoredCredential>> {
        match self.get(identity)? {
            Some(record) => Ok(Some(StoredCredential {
                identity: identity.clone(),
                digest: record.digest()?,
            })),
            None => Ok(None),
        }
    }
}
