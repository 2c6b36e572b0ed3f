//! Salted one-way password hashing (Argon2id, PHC string format).

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;

const DUMMY_SECRET: &str = "wayfarer-dummy-credential";

lazy_static! {
    /// Hash verified against when the looked-up account does not exist, so
    /// that unknown accounts and wrong passwords take the same path.
    static ref DUMMY_HASH: Option<String> = match hash_password(DUMMY_SECRET) {
        Ok(hash) => Some(hash),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build dummy password hash");
            None
        }
    };
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash. The digest comparison inside the
/// verifier is constant-time.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Verify against an optional stored hash. A missing hash still costs one
/// full verification and always fails.
pub fn verify_password_or_dummy(password: &str, hash: Option<&str>) -> bool {
    match hash {
        Some(hash) => verify_password(password, hash),
        None => {
            match DUMMY_HASH.as_deref() {
                Some(dummy) => {
                    let _ = verify_password(password, dummy);
                }
                // Hashing costs the same Argon2 work as a verification
                None => {
                    let _ = hash_password(password);
                }
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn test_missing_hash_fails_even_for_dummy_secret() {
        assert!(!verify_password_or_dummy(DUMMY_SECRET, None));
    }

    #[test]
    fn test_dummy_hash_is_a_real_argon2_hash() {
        let dummy = DUMMY_HASH.as_deref().unwrap();
        assert!(PasswordHash::new(dummy).is_ok());
        assert!(verify_password(DUMMY_SECRET, dummy));
    }
}
