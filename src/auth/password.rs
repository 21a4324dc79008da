//! Password hashing and credential policy.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::ServiceError;

/// Server-side minimum password length. The authoritative rule; a stricter
/// complexity hint exists client-side but is not enforced here.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Hashes a password with Argon2id and a fresh random salt.
pub fn hash_password(plaintext: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {e}")))
}

/// Verifies a plaintext candidate against a stored PHC hash string.
/// A malformed stored hash verifies as false rather than erroring.
pub fn verify_password(stored_hash: &str, plaintext: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Validates a new credential: minimum length and matching confirmation.
pub fn validate_new_password(new_password: &str, confirm: &str) -> Result<(), ServiceError> {
    if new_password.len() < MIN_PASSWORD_LEN {
        return Err(ServiceError::ValidationError(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if new_password != confirm {
        return Err(ServiceError::ValidationError(
            "Passwords do not match".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("hunter2secret").unwrap();
        assert!(verify_password(&hash, "hunter2secret"));
        assert!(!verify_password(&hash, "hunter2wrong"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "anything"));
        assert!(!verify_password("", "anything"));
    }

    #[test]
    fn new_password_policy() {
        assert!(validate_new_password("abcdef", "abcdef").is_ok());
        assert!(validate_new_password("abc", "abc").is_err());
        assert!(validate_new_password("abcdef", "abcdeg").is_err());
    }
}
