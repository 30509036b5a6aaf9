//! Opaque bearer token generation and hashing.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Attempts before giving up on a colliding token hash.
pub(super) const MINT_ATTEMPTS: usize = 3;

/// Create a new random access token.
/// The raw value is only returned to the client; stores keep a hash.
pub(super) fn generate_access_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate access token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash an access token so raw values never touch storage.
pub(super) fn hash_access_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
