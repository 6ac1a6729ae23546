//! # AuthGate API Server Library
//!
//! HTTP surface of AuthGate: session endpoints backed by refresh-token
//! rotation, and per-user items behind bearer authentication.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
