// Password hashing and verification

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::warn;

use crate::auth::error::AuthError;

/// Password service for hashing and verification
pub struct PasswordService;

impl PasswordService {
    /// Hash a password using Argon2id with a random salt
    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::PasswordHashError)
    }

    /// Verify a password against a stored PHC hash.
    ///
    /// A stored value that is not a valid hash never matches.
    pub fn verify_password(password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(err) => {
                warn!("Stored password hash is not a valid PHC string: {}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = PasswordService::hash_password("123456").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(PasswordService::verify_password("123456", &hash));
        assert!(!PasswordService::verify_password("1234567", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = PasswordService::hash_password("same password").unwrap();
        let b = PasswordService::hash_password("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_plaintext_stored_value_never_matches() {
        assert!(!PasswordService::verify_password("123456", "123456"));
        assert!(!PasswordService::verify_password("", ""));
    }
}
