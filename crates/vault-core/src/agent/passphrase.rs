//! Password validation for new keysets.

use crate::error::{Result, VaultError};

/// Validate that `password` is acceptable for wrapping a new keyset.
///
/// Only applied when keys are created; unlocking accepts whatever the
/// keyset was sealed with.
pub fn validate_password(password: &str, min_length: usize) -> Result<()> {
    if password.trim().is_empty() {
        return Err(VaultError::Validation(
            "Password cannot be empty".to_string(),
        ));
    }

    let length = password.chars().count();
    if length < min_length {
        return Err(VaultError::Validation(format!(
            "Password must be at least {} characters (got {})",
            min_length, length
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_password() {
        assert!(validate_password("my-secure-password-123", 8).is_ok());
        assert!(validate_password("12345678", 8).is_ok());
    }

    #[test]
    fn test_password_too_short() {
        let result = validate_password("hunter2", 8);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("at least 8 characters"));
    }

    #[test]
    fn test_password_empty() {
        assert!(validate_password("", 0).is_err());
        assert!(validate_password("   ", 0).is_err());
    }

    #[test]
    fn test_length_counts_characters() {
        assert!(validate_password("pässwörd", 8).is_ok());
    }
}
