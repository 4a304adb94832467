//! User-record persistence for authd, backed by fjall
//!
//! Owns the `users` partition of an LSM keyspace and implements the core's
//! [`CredentialSource`] seam. Records are JSON-encoded; plaintext
//! passwords never reach disk.
//!
//! [`CredentialSource`]: authd_core::CredentialSource

pub mod record;
pub mod store;

pub use record::*;
pub use store::*;
