use super::AppState;
use crate::error::{PortalError, PortalResult};
use crate::types::*;

fn required(value: &str, field: &str) -> PortalResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PortalError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

impl AppState {
    /// Register a mentor (admin only)
    pub async fn add_mentor(&self, name: &str, email: &str, password: &str) -> PortalResult<Account> {
        let name = required(name, "Name")?;
        self.create_account(name, email, password, Role::Mentor, Vec::new())
            .await
    }

    /// Register a team (admin only). Blank member names are dropped.
    pub async fn add_team(
        &self,
        name: &str,
        email: &str,
        password: &str,
        members: Vec<String>,
    ) -> PortalResult<Account> {
        let name = required(name, "Team name")?;
        let members: Vec<String> = members
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if members.len() > MAX_TEAM_MEMBERS {
            return Err(PortalError::Validation(format!(
                "A team has at most {} members",
                MAX_TEAM_MEMBERS
            )));
        }
        self.create_account(name, email, password, Role::Team, members)
            .await
    }

    /// Accounts in the users collection (admins and mentors)
    pub async fn list_members(&self) -> PortalResult<Vec<Account>> {
        Ok(self.store.list_accounts(AccountCollection::Users).await?)
    }

    pub async fn list_teams(&self) -> PortalResult<Vec<Account>> {
        Ok(self.store.list_accounts(AccountCollection::Teams).await?)
    }

    async fn create_account(
        &self,
        name: String,
        email: &str,
        password: &str,
        role: Role,
        members: Vec<String>,
    ) -> PortalResult<Account> {
        let uid = self.identity.register(email, password).await?;

        let account = Account {
            uid,
            name,
            email: email.trim().to_lowercase(),
            role,
            members,
            voted: false,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        if let Err(e) = self.store.insert_account(account.clone()).await {
            // Roll the identity back so the email can be used again
            if let Err(undo) = self.identity.remove(&account.uid).await {
                tracing::error!(
                    "Failed to remove identity {} after account write failed: {}",
                    account.uid,
                    undo
                );
            }
            return Err(e.into());
        }

        tracing::info!("Added {:?} account {}", role, account.name);
        Ok(account)
    }
}
