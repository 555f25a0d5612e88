//! Argon2id hashes stored in `users.password` as PHC strings.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::RosterError;

pub fn hash_password(password: &str) -> Result<String, RosterError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| RosterError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a candidate password against a stored PHC string. Values that do not
/// parse never verify.
pub fn verify_password(stored: &str, candidate: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}
