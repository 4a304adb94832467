//! Error types for authd

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// The key manager was consulted before a keypair was loaded.
    #[error("key manager is not initialized")]
    NotInitialized,

    /// Key material could not be read or parsed. The key manager keeps
    /// whatever state it had before the failed attempt.
    #[error("key load error: {0}")]
    KeyLoad(String),

    /// Credential lookup miss or digest mismatch. Deliberately carries no
    /// detail: callers must not be able to tell the two cases apart.
    #[error("auth invalid")]
    AuthInvalid,

    /// Token could not be decoded into header/claims/signature.
    #[error("malformed token")]
    MalformedToken,

    /// Token header declares a different algorithm than the verifier expects.
    #[error("token algorithm mismatch: expected {expected}, found {found}")]
    AlgorithmMismatch { expected: String, found: String },

    /// Cryptographic signature check failed.
    #[error("token signature invalid")]
    SignatureInvalid,

    /// Signature is good but the token is past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// The underlying signature operation failed during issuance.
    #[error("signing error: {0}")]
    Signing(String),

    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    #[error("invalid credential digest: {0}")]
    InvalidDigest(String),

    #[error("user not found: {id}")]
    UserNotFound { id: String },

    #[error("user already exists: {id}")]
    UserAlreadyExists { id: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Whether this error is an expected business outcome rather than a
    /// fault. Expected outcomes are returned to callers as-is and never
    /// logged as errors.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            AuthError::AuthInvalid
                | AuthError::MalformedToken
                | AuthError::AlgorithmMismatch { .. }
                | AuthError::SignatureInvalid
                | AuthError::TokenExpired
                | AuthError::UserNotFound { .. }
                | AuthError::UserAlreadyExists { .. }
        )
    }
}
