/// Password hashing module using Argon2id
///
/// Credentials are stored as PHC strings produced by Argon2id with a fresh
/// random salt per hash. The work factor is configurable through
/// [`PasswordParams`]; the defaults keep a single verification in the tens of
/// milliseconds.
///
/// # Security
///
/// - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
/// - **Memory**: 19 MiB (19456 KiB) by default
/// - **Iterations**: 2 passes by default
/// - **Parallelism**: 1 lane by default
/// - **Output**: 32-byte hash
///
/// Hashing and verification are CPU-bound. Async callers must run them on a
/// blocking worker (see [`crate::auth::session`]).
///
/// # Example
///
/// ```
/// use authgate_shared::auth::password::PasswordHasher;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = PasswordHasher::default();
/// let hash = hasher.hash("Abcdef1!")?;
///
/// assert!(hasher.verify("Abcdef1!", &hash)?);
/// assert!(!hasher.verify("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};

/// Characters accepted as "special" by the password policy
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordParams {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Salted, adaptive one-way password hasher
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher {
    params: PasswordParams,
}

impl PasswordHasher {
    /// Creates a hasher with custom cost parameters
    pub fn new(params: PasswordParams) -> Self {
        Self { params }
    }

    /// Hashes a password into a PHC string
    ///
    /// Example output:
    /// ```text
    /// $argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHRzYWx0$hash...
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` if the parameters are rejected by
    /// argon2 or hashing fails
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let params = ParamsBuilder::new()
            .m_cost(self.params.memory_kib)
            .t_cost(self.params.iterations)
            .p_cost(self.params.parallelism)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    /// Verifies a password against a stored hash
    ///
    /// The cost parameters are read from the hash itself, so hashes produced
    /// under older parameters keep verifying. Comparison is constant-time.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the password matches, `Ok(false)` if it doesn't
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::InvalidHash` if the stored hash cannot be parsed
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
        }
    }
}

/// Validates password strength
///
/// Checks that password meets the registration policy:
/// - At least 8 characters long
/// - Contains at least one uppercase letter
/// - Contains at least one lowercase letter
/// - Contains at least one digit
/// - Contains at least one special character from [`SPECIAL_CHARACTERS`]
///
/// # Example
///
/// ```
/// use authgate_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("Abcdef1!").is_ok());
/// assert!(validate_password_strength("Sh0rt!").is_err());
/// assert!(validate_password_strength("Password123").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number".to_string());
    }

    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}
