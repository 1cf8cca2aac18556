//! Password hashing with bcrypt.
//!
//! The cost factor is fixed at the library default; it is not user-tunable.
//! Hashes embed their own salt, so storage is a single opaque string.

use bcrypt::{hash, verify, DEFAULT_COST};

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

/// Returns `Ok(true)` when the password matches the stored hash.
pub fn verify_password(password: &str, hashed: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hashed)
}
