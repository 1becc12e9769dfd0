//! Input validation for the account layer
//!
//! Keeps malformed usernames out of storage keys and rejects unusable
//! credentials before they are hashed.

use anyhow::{anyhow, Result};

/// Maximum username length
pub const MAX_USERNAME_LENGTH: usize = 128;

/// Maximum password length accepted before hashing
pub const MAX_PASSWORD_LENGTH: usize = 512;

/// Validate a username
///
/// Usernames become part of storage keys, so the character set is restricted
/// to alphanumerics plus a few separators.
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(anyhow!("username cannot be empty"));
    }

    if username.len() > MAX_USERNAME_LENGTH {
        return Err(anyhow!(
            "username too long: {} chars (max: {})",
            username.len(),
            MAX_USERNAME_LENGTH
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '@' || c == '.')
    {
        return Err(anyhow!(
            "username contains invalid characters (allowed: alphanumeric, -, _, @, .)"
        ));
    }

    Ok(())
}

/// Validate a password prior to hashing
pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(anyhow!("password cannot be empty"));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(anyhow!(
            "password too long: {} chars (max: {})",
            password.len(),
            MAX_PASSWORD_LENGTH
        ));
    }

    Ok(())
}
