//! Email/password identity provider.
//!
//! Stands in for a hosted auth service: it only turns credentials into a
//! stable uid. Roles live on the account records in the document store.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{PortalError, PortalResult};
use crate::types::Uid;

/// Shortest password the provider accepts
pub const MIN_PASSWORD_LEN: usize = 6;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create credentials for a new identity
    async fn register(&self, email: &str, password: &str) -> PortalResult<Uid>;

    /// Check credentials and return the identity they belong to
    async fn verify(&self, email: &str, password: &str) -> PortalResult<Uid>;

    /// Drop an identity again (used to undo a registration whose account
    /// record could not be written)
    async fn remove(&self, uid: &str) -> PortalResult<()>;

    /// All credential records, for snapshots
    async fn records(&self) -> Vec<CredentialRecord>;

    /// Replace all credentials with the given records
    async fn restore(&self, records: Vec<CredentialRecord>);
}

/// Stored credential (never the password itself)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialRecord {
    pub uid: Uid,
    pub email: String,
    /// Argon2 PHC string, salt included
    pub password_hash: String,
}

/// In-memory provider keyed by normalized email
#[derive(Debug, Default)]
pub struct LocalIdentityProvider {
    credentials: RwLock<HashMap<String, CredentialRecord>>,
}

/// Emails compare case-insensitively
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a password with Argon2 and a fresh random salt
fn hash_password(password: &str) -> PortalResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PortalError::StoreUnavailable(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored PHC string
fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

/// Minimal shape check, the real provider does its own validation
fn validate_email(email: &str) -> PortalResult<()> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(PortalError::Validation("Email address is invalid".to_string()));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || email.contains(' ') {
        return Err(PortalError::Validation("Email address is invalid".to_string()));
    }
    Ok(())
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn register(&self, email: &str, password: &str) -> PortalResult<Uid> {
        let email = normalize_email(email);
        validate_email(&email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PortalError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let mut credentials = self.credentials.write().await;
        if credentials.contains_key(&email) {
            return Err(PortalError::Conflict(format!("email {}", email)));
        }

        let record = CredentialRecord {
            uid: ulid::Ulid::new().to_string(),
            email: email.clone(),
            password_hash: hash_password(password)?,
        };
        let uid = record.uid.clone();
        credentials.insert(email, record);

        tracing::debug!("Registered identity {}", uid);
        Ok(uid)
    }

    async fn verify(&self, email: &str, password: &str) -> PortalResult<Uid> {
        let credentials = self.credentials.read().await;
        let record = credentials
            .get(&normalize_email(email))
            .ok_or(PortalError::InvalidCredentials)?;

        if verify_password(password, &record.password_hash) {
            Ok(record.uid.clone())
        } else {
            Err(PortalError::InvalidCredentials)
        }
    }

    async fn remove(&self, uid: &str) -> PortalResult<()> {
        let mut credentials = self.credentials.write().await;
        let before = credentials.len();
        credentials.retain(|_, record| record.uid != uid);
        if credentials.len() == before {
            return Err(PortalError::NotFound(format!("identity {}", uid)));
        }
        Ok(())
    }

    async fn records(&self) -> Vec<CredentialRecord> {
        let mut records: Vec<_> = self.credentials.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.email.cmp(&b.email));
        records
    }

    async fn restore(&self, records: Vec<CredentialRecord>) {
        let mut credentials = self.credentials.write().await;
        credentials.clear();
        for record in records {
            credentials.insert(normalize_email(&record.email), record);
        }
    }
}
