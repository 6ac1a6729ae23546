/// Authentication core
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength policy
/// - [`jwt`]: access and refresh token issuance and validation
/// - [`session`]: register, login, refresh and logout over a credential store
/// - [`middleware`]: bearer authentication for Axum and the [`middleware::Principal`] extractor
///
/// # Security Properties
///
/// - **Passwords**: stored only as salted argon2id hashes, verified off the async runtime
/// - **Tokens**: HS256 with a separate secret per token class
/// - **Refresh rotation**: each refresh token is usable once; logout revokes it
/// - **Uniform failures**: unknown email and wrong password are indistinguishable

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod session;
