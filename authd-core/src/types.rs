//! Core data types for authd

use serde::{Deserialize, Serialize};

/// Identity a user authenticates as and a token is issued for
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a new user id with validation
    pub fn new(id: &str) -> crate::Result<Self> {
        if id.is_empty() {
            return Err(crate::AuthError::InvalidUserId("empty id".to_string()));
        }

        // Identifier charset: alphanumeric plus a few separators seen in
        // account names and email-style ids
        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        {
            return Err(crate::AuthError::InvalidUserId(format!(
                "invalid characters in '{}'",
                id
            )));
        }

        Ok(UserId(id.to_string()))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
