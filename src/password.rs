//! Password policy and hashing

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::ApiError;

pub const MIN_PASSWORD_LENGTH: usize = 7;

pub const SHORT_PASSWORD_MESSAGE: &str = "Password must be at least 7 characters long.";
pub const PASSWORD_PATTERN_MESSAGE: &str = "Password must contain at least one letter and one digit.";

/// True iff the password has at least [`MIN_PASSWORD_LENGTH`] characters
pub fn check_password_length(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

/// True iff the password holds at least one ASCII letter and one ASCII digit
pub fn check_password_pattern(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_alphabetic()) && password.chars().any(|c| c.is_ascii_digit())
}

/// Run both checks, length first
pub fn validate_password(password: &str) -> crate::Result<()> {
    if !check_password_length(password) {
        return Err(ApiError::Input(SHORT_PASSWORD_MESSAGE.to_string()));
    }

    if !check_password_pattern(password) {
        return Err(ApiError::Input(PASSWORD_PATTERN_MESSAGE.to_string()));
    }

    Ok(())
}

/// Hash a password into an argon2 PHC string
pub fn hash_password(password: &str) -> crate::Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("password hashing failed: {}", e)))
}

/// Verify a password against a stored PHC string
pub fn verify_password(password: &str, hash: &str) -> crate::Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::internal(format!("stored password hash is malformed: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_passwords_fail_length() {
        for password in ["", "a1", "abc123", "123456", "ab!@#$"] {
            assert!(!check_password_length(password), "{password:?} should be too short");
        }
        assert!(check_password_length("abcd123"));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // six characters, twelve bytes
        assert!(!check_password_length("ééééé1"));
        assert!(check_password_length("éééééé1"));
    }

    #[test]
    fn test_pattern_requires_letter_and_digit() {
        assert!(!check_password_pattern("abcdefgh"));
        assert!(!check_password_pattern("12345678"));
        assert!(!check_password_pattern("!!!!!!!!"));
        assert!(check_password_pattern("abcd1234"));
        assert!(check_password_pattern("1234abcd"));
        assert!(check_password_pattern("!1!a!"));
    }

    #[test]
    fn test_validate_reports_length_before_pattern() {
        let err = validate_password("abc").unwrap_err();
        assert_eq!(err, ApiError::Input(SHORT_PASSWORD_MESSAGE.to_string()));

        let err = validate_password("abcdefg").unwrap_err();
        assert_eq!(err, ApiError::Input(PASSWORD_PATTERN_MESSAGE.to_string()));

        assert!(validate_password("abcd1234").is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("abcd1234").unwrap();
        assert_ne!(hash, "abcd1234");
        assert!(verify_password("abcd1234", &hash).unwrap());
        assert!(!verify_password("abcd12345", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        let err = verify_password("abcd1234", "abcd1234").unwrap_err();
        assert_eq!(err.code(), 500);
    }
}
