/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Session endpoints (register, login, refresh, logout)
/// - `items`: Per-user items, bearer authentication required

pub mod auth;
pub mod health;
pub mod items;
