//! Operator login: credential verification and per-session state.

use crate::config::AuthConfig;
use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use log::warn;

pub mod session;

pub use session::{LoginOutcome, SessionContext, SessionStore};

pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Checks a single operator account against an Argon2 PHC hash.
#[derive(Debug, Clone)]
pub struct Argon2Verifier {
    username: String,
    password_hash: String,
}

impl Argon2Verifier {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Result<Self> {
        let password_hash = password_hash.into();
        PasswordHash::new(&password_hash)
            .map_err(|e| anyhow!("Invalid password hash format: {e}"))?;
        Ok(Self {
            username: username.into(),
            password_hash,
        })
    }

    /// `None` when no account is configured.
    pub fn from_config(config: &AuthConfig) -> Result<Option<Self>> {
        match (&config.username, &config.password_hash) {
            (Some(username), Some(hash)) => Self::new(username.clone(), hash.clone()).map(Some),
            (Some(_), None) | (None, Some(_)) => Err(anyhow!(
                "AUTH_USERNAME and AUTH_PASSWORD_HASH must be set together"
            )),
            (None, None) => Ok(None),
        }
    }
}

impl CredentialVerifier for Argon2Verifier {
    fn verify(&self, username: &str, password: &str) -> bool {
        if username != self.username {
            return false;
        }
        let parsed = match PasswordHash::new(&self.password_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash is unreadable: {e}");
                return false;
            }
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Used when no operator account is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

impl CredentialVerifier for RejectAll {
    fn verify(&self, _username: &str, _password: &str) -> bool {
        false
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {e}"))?;
    Ok(hash.to_string())
}
