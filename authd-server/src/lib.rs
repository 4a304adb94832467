//! HTTP surface for authd
//!
//! Thin routing and JSON envelope layer over the core: every route
//! delegates to the key manager, the token authority, the authenticator,
//! or the user store, and maps typed errors onto HTTP statuses.

pub mod handlers;
pub mod model;
pub mod server;
