/// Data models
///
/// - `user`: accounts with their valid refresh-token sets
/// - `item`: per-user resources behind bearer authorization
///
/// Storage lives in [`crate::store`].

pub mod item;
pub mod user;
