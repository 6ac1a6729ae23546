//! # AuthGate Shared Library
//!
//! Credential and token lifecycle engine used by the AuthGate API server.
//!
//! ## Module Organization
//!
//! - `auth`: password hashing, token issuance, sessions and bearer middleware
//! - `models`: users and items
//! - `store`: storage contracts with in-memory and PostgreSQL implementations
//! - `db`: connection pool and migrations for the PostgreSQL store

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the AuthGate shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
