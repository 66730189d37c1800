//! Password hashing via bcrypt, plus random secret generation.

use std::sync::OnceLock;

use rand::distr::Alphanumeric;
use rand::{Rng, rng};

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// Burn the same bcrypt work as a real check when no account matched, so
/// response timing does not reveal whether an identifier exists.
pub fn verify_against_dummy(password: &str) {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    let hash = DUMMY_HASH.get_or_init(|| bcrypt::hash(generate_secret(32), BCRYPT_COST).ok());
    if let Some(hash) = hash {
        let _ = bcrypt::verify(password, hash);
    }
}

/// Generate a random alphanumeric secret of `len` characters.
pub fn generate_secret(len: usize) -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
