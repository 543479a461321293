//! Secret hashing for fields flagged on the record type

use crate::errors::{ExError, ExErrorKind};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use cascade_core_types::Sensitive;

pub trait Hasher {
    /// One-way hash of `plaintext`, suitable for storage
    ///
    /// # Errors
    ///
    /// Returns a `Hashing` error if the backend cannot produce a hash.
    fn hash(&self, plaintext: &Sensitive<String>) -> Result<String, ExError>;
}

/// argon2id with a random salt, PHC string output
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }

    /// Whether `plaintext` matches a PHC hash produced by [`Hasher::hash`]
    ///
    /// # Errors
    ///
    /// Returns a `Hashing` error if `hash` is not a PHC string.
    pub fn verify(&self, plaintext: &Sensitive<String>, hash: &str) -> Result<bool, ExError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            ExError::new(ExErrorKind::Hashing)
                .with_op("verify")
                .with_message(format!("invalid hash format: {}", e))
        })?;
        Ok(Argon2::default()
            .verify_password(plaintext.expose().as_bytes(), &parsed)
            .is_ok())
    }
}

impl Hasher for Argon2Hasher {
    fn hash(&self, plaintext: &Sensitive<String>) -> Result<String, ExError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plaintext.expose().as_bytes(), &salt)
            .map_err(|e| {
                ExError::new(ExErrorKind::Hashing)
                    .with_op("hash")
                    .with_message(format!("failed to hash: {}", e))
            })?;
        Ok(hash.to_string())
    }
}
