use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use super::AppState;
use crate::auth::AuthConfig;
use crate::error::{PortalError, PortalResult};
use crate::types::*;

/// 256-bit random bearer token
fn generate_token() -> SessionToken {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

impl AppState {
    /// Create the configured admin account if it does not exist yet
    pub async fn seed_admin(&self, config: &AuthConfig) -> PortalResult<()> {
        let Some((email, password)) = config.admin_credentials() else {
            return Ok(());
        };

        let uid = match self.identity.verify(email, password).await {
            Ok(uid) => uid,
            Err(PortalError::InvalidCredentials) => {
                match self.identity.register(email, password).await {
                    Ok(uid) => uid,
                    Err(PortalError::Conflict(_)) => {
                        // Restored credentials carry a different password
                        tracing::warn!(
                            "Admin email {} exists with another password, keeping stored credentials",
                            email
                        );
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        if self
            .store
            .find_account(AccountCollection::Users, &uid)
            .await?
            .is_some()
        {
            tracing::debug!("Admin account already present");
            return Ok(());
        }

        self.store
            .insert_account(Account {
                uid,
                name: config.admin_name.clone(),
                email: email.to_lowercase(),
                role: Role::Admin,
                members: Vec::new(),
                voted: false,
                created_at: chrono::Utc::now().to_rfc3339(),
            })
            .await?;
        tracing::info!("Seeded admin account {}", email);
        Ok(())
    }

    /// Verify credentials and open a session for the account found in the
    /// collection selected by `account_type`
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        account_type: AccountType,
    ) -> PortalResult<Session> {
        let uid = self.identity.verify(email, password).await?;

        let account = self
            .store
            .find_account(account_type.collection(), &uid)
            .await?
            .ok_or_else(|| {
                tracing::info!("Login for {} found no {:?} account", uid, account_type);
                PortalError::AccountNotFound(
                    match account_type {
                        AccountType::Member => "member",
                        AccountType::Team => "team",
                    }
                    .to_string(),
                )
            })?;

        let session = Session {
            token: generate_token(),
            uid: account.uid,
            name: account.name,
            role: account.role,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());

        tracing::info!("{} signed in as {:?}", session.name, session.role);
        Ok(session)
    }

    /// Look up the session behind a bearer token
    pub async fn resolve_session(&self, token: &str) -> PortalResult<Session> {
        self.sessions
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(PortalError::Unauthorized)
    }

    /// End a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) {
        if let Some(session) = self.sessions.write().await.remove(token) {
            tracing::info!("{} signed out", session.name);
        }
    }
}
