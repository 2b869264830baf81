//! Password hashing.
//!
//! Argon2id with a per-hash random salt, stored as a PHC string.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use once_cell::sync::Lazy;

// Hash of a throwaway secret, verified against when no account matches so an
// unknown email costs the same Argon2 work as a wrong password.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("no-such-account").ok());

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed")]
    HashingFailed,
}

/// Hashes `password` with a freshly generated salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordError::HashingFailed)
}

/// Checks `password` against a stored PHC hash. A stored value that is not a
/// valid hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(_) => {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Spends one full verification against a hash no account owns.
pub fn verify_dummy_password(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}
