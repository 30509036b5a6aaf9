//! Password hashing.
//!
//! Hashes are PHC strings, so each hash records the algorithm and cost it was
//! created with and verification keeps working after the defaults change.

use anyhow::{Result, anyhow};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
};
use rand::rngs::OsRng;

/// One-way password hashing capability.
pub trait PasswordHasher: Send + Sync {
    /// Hash a raw password into a self-describing string.
    ///
    /// # Errors
    /// Returns an error if the hasher cannot produce a hash.
    fn hash(&self, password: &str) -> Result<String>;

    /// Check a raw password against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch; errors are reserved for unreadable hashes.
    ///
    /// # Errors
    /// Returns an error if `hash` cannot be parsed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Argon2id hasher.
#[derive(Clone, Debug, Default)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Build a hasher with explicit cost parameters (memory in KiB, iterations, lanes).
    ///
    /// # Errors
    /// Returns an error if the parameters are out of range.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| anyhow!("invalid argon2 parameters: {e}"))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("failed to hash password: {e}"))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| anyhow!("stored password hash is invalid: {e}"))?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow!("failed to verify password: {e}")),
        }
    }
}
