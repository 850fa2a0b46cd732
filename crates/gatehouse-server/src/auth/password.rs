//! PIN and password hashing using argon2id.

use argon2::password_hash::{Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand_core::OsRng;

/// Hash a PIN or password into a PHC string with a fresh random salt.
pub fn hash_password(secret: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(secret.as_bytes(), &salt)?
        .to_string())
}

/// Verify a plaintext PIN or password against a stored PHC string.
///
/// A mismatch is `Ok(false)`; only a malformed or unsupported hash is
/// an error, so the wrong-PIN path stays distinguishable from a
/// corrupted credential row.
pub fn verify_password(secret: &str, hash: &str) -> Result<bool, Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("1234").unwrap();
        assert!(verify_password("1234", &hash).unwrap());
        assert!(!verify_password("4321", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("1234").unwrap();
        let b = hash_password("1234").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("1234", "not-a-phc-string").is_err());
    }
}
