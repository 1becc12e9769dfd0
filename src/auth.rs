//! Account layer: registration, login, and the session pointer
//!
//! Credentials are hashed with Argon2id and stored as PHC strings in the user
//! table. The maintenance engine and backup path treat the hash as an opaque
//! non-empty string, so the scheme can evolve without touching them.

use std::fmt;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::info;

use crate::store::{ContentStore, UserRecord};
use crate::validation::{validate_password, validate_username};

/// Account errors
#[derive(Debug)]
pub enum AuthError {
    /// Registration for a username that already exists
    UserExists(String),
    /// Login for a username with no record
    UnknownUser(String),
    /// Password did not verify against the stored hash
    InvalidCredentials,
    /// Username or password failed validation
    InvalidInput(String),
    /// Storage or hashing failure
    Internal(anyhow::Error),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserExists(name) => write!(f, "user '{name}' already exists"),
            Self::UnknownUser(name) => write!(f, "unknown user '{name}'"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::InvalidInput(reason) => write!(f, "invalid input: {reason}"),
            Self::Internal(err) => write!(f, "internal error: {err}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

/// Verify a password against a stored PHC string
///
/// A malformed stored hash counts as a failed verification, not an error;
/// login is best-effort against whatever the table holds.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Registration and login over the user table
#[derive(Clone)]
pub struct Authenticator {
    store: ContentStore,
}

impl Authenticator {
    pub fn new(store: ContentStore) -> Self {
        Self { store }
    }

    /// Create an account and sign it in
    pub fn register(&self, username: &str, password: &str) -> Result<UserRecord, AuthError> {
        validate_username(username).map_err(|e| AuthError::InvalidInput(e.to_string()))?;
        validate_password(password).map_err(|e| AuthError::InvalidInput(e.to_string()))?;

        let users = self.store.users()?;
        if users.contains_key(username) {
            return Err(AuthError::UserExists(username.to_string()));
        }

        let password_hash = hash_password(password)?;
        self.store.save_user(username, &password_hash)?;

        let record = UserRecord {
            username: username.to_string(),
            password_hash,
        };
        self.store.set_current_user(Some(&record))?;

        info!(user = %username, "account registered");
        Ok(record)
    }

    /// Sign in an existing account
    pub fn login(&self, username: &str, password: &str) -> Result<UserRecord, AuthError> {
        let users = self.store.users()?;
        let record = users
            .get(username)
            .ok_or_else(|| AuthError::UnknownUser(username.to_string()))?;

        if !verify_password(password, &record.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        self.store.set_current_user(Some(record))?;
        info!(user = %username, "signed in");
        Ok(record.clone())
    }

    /// Clear the session pointer
    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.set_current_user(None)?;
        Ok(())
    }

    /// Currently signed-in user, if any
    pub fn current_user(&self) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.store.current_user()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("hunter2", "not-a-phc-string"));
        assert!(!verify_password("hunter2", ""));
    }
}
