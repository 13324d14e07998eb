//! JSON user store: `username -> {password, role?, access}`.
//!
//! New passwords are hashed as argon2 PHC strings; existing bcrypt
//! (`$2y$` and friends) hashes still verify. The file is re-read on each login so
//! accounts created by admin tooling take effect without a restart.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use serde::{Deserialize, Serialize};

use crate::access::{resolve_identity, AccessGrant, Identity};
use crate::session::SessionState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub access: AccessGrant,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    /// Session contents after a successful login.
    pub fn to_session(&self, username: &str) -> SessionState {
        SessionState::logged_in(username, self.role.clone(), self.access.clone())
    }

    /// Identity this account gets from a credential login, ignoring IP ranges.
    pub fn identity(&self, username: &str) -> Identity {
        resolve_identity(&self.to_session(username), None, &[]).identity
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    /// Unknown user and wrong password are deliberately indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("user store {path} unreadable: {message}")]
    Unavailable { path: String, message: String },

    #[error("password hashing failed: {0}")]
    Hash(String),
}

pub struct UserStore {
    path: PathBuf,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<HashMap<String, UserRecord>, UserStoreError> {
        let unavailable = |message: String| UserStoreError::Unavailable {
            path: self.path.display().to_string(),
            message,
        };
        let contents = fs::read_to_string(&self.path).map_err(|e| unavailable(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| unavailable(e.to_string()))
    }

    pub fn lookup(&self, username: &str) -> Result<Option<UserRecord>, UserStoreError> {
        Ok(self.load()?.remove(username))
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<UserRecord, UserStoreError> {
        let record = self.lookup(username)?.ok_or(UserStoreError::InvalidCredentials)?;
        if verify_password(&record.password, password) {
            Ok(record)
        } else {
            Err(UserStoreError::InvalidCredentials)
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, UserStoreError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| UserStoreError::Hash(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| UserStoreError::Hash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| UserStoreError::Hash(e.to_string()))
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if is_bcrypt(hash) {
        return bcrypt::verify(password, hash).unwrap_or(false);
    }

    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

fn is_bcrypt(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"].iter().any(|prefix| hash.starts_with(prefix))
}
