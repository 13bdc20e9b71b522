//! Authorization boundary
//!
//! Every portal operation is named by an [`Action`]. Whether a role may
//! perform it is decided in one exhaustive match, before any state is touched.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{PortalError, PortalResult};
use crate::state::AppState;
use crate::types::{Role, Session};

/// Admin account configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Admin login email (None = no admin seeded)
    pub admin_email: Option<String>,
    /// Admin password
    pub admin_password: Option<String>,
    /// Display name of the admin account
    pub admin_name: String,
}

impl AuthConfig {
    /// Load auth config from environment variables
    /// ADMIN_EMAIL and ADMIN_PASSWORD must both be set to seed an admin
    pub fn from_env() -> Self {
        let admin_email = std::env::var("ADMIN_EMAIL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let admin_password = std::env::var("ADMIN_PASSWORD")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let admin_name = std::env::var("ADMIN_NAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Admin".to_string());

        if admin_email.is_some() && admin_password.is_some() {
            tracing::info!("Admin account configured");
            Self {
                admin_email,
                admin_password,
                admin_name,
            }
        } else {
            if admin_email.is_some() || admin_password.is_some() {
                tracing::warn!(
                    "ADMIN_EMAIL and ADMIN_PASSWORD must both be set to create the admin account"
                );
            }
            tracing::warn!("No admin account configured - rosters and voting cannot be managed!");
            Self {
                admin_email: None,
                admin_password: None,
                admin_name,
            }
        }
    }

    /// Admin credentials if both halves are present
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        }
    }
}

/// Operations that need a signed-in caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ManageRoster,
    ViewMembers,
    ViewTeams,
    CurateCandidates,
    ControlPhase,
    ViewLiveTally,
    ManageState,
    CastVote,
    UploadGame,
    LikeGame,
    CommentGame,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Action::ManageRoster => "manage members and teams",
            Action::ViewMembers => "view members",
            Action::ViewTeams => "view teams",
            Action::CurateCandidates => "curate the voting roster",
            Action::ControlPhase => "control the voting phase",
            Action::ViewLiveTally => "view the live tally",
            Action::ManageState => "export or import state",
            Action::CastVote => "vote",
            Action::UploadGame => "upload games",
            Action::LikeGame => "like games",
            Action::CommentGame => "comment on games",
        };
        f.write_str(text)
    }
}

/// Capability matrix
pub fn permits(role: Role, action: Action) -> bool {
    use Action::*;

    match role {
        Role::Admin => match action {
            ManageRoster | ViewMembers | ViewTeams | CurateCandidates | ControlPhase
            | ViewLiveTally | ManageState | LikeGame | CommentGame => true,
            CastVote | UploadGame => false,
        },
        Role::Mentor => match action {
            ViewMembers | ViewTeams | CastVote | LikeGame | CommentGame => true,
            ManageRoster | CurateCandidates | ControlPhase | ViewLiveTally | ManageState
            | UploadGame => false,
        },
        Role::Team => match action {
            ViewTeams | CastVote | UploadGame | LikeGame | CommentGame => true,
            ManageRoster | ViewMembers | CurateCandidates | ControlPhase | ViewLiveTally
            | ManageState => false,
        },
    }
}

/// Require a session whose role permits `action`
pub fn authorize(session: Option<&Session>, action: Action) -> PortalResult<&Session> {
    let session = session.ok_or(PortalError::Unauthorized)?;
    if permits(session.role, action) {
        Ok(session)
    } else {
        tracing::info!(
            "Denied {:?} for {} ({:?})",
            action,
            session.uid,
            session.role
        );
        Err(PortalError::Forbidden(action))
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor for routes that require a signed-in caller
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl FromRequestParts<Arc<AppState>> for CurrentSession {
    type Rejection = PortalError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(PortalError::Unauthorized)?;
        state.resolve_session(token).await.map(CurrentSession)
    }
}

/// Extractor for routes that behave differently for signed-in callers.
/// An unknown token is treated as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl FromRequestParts<Arc<AppState>> for MaybeSession {
    type Rejection = PortalError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(MaybeSession(None));
        };
        Ok(MaybeSession(state.resolve_session(token).await.ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serial_test::serial;

    fn session(role: Role) -> Session {
        Session {
            token: "tok".to_string(),
            uid: "u1".to_string(),
            name: "Someone".to_string(),
            role,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_only_voters_vote() {
        assert!(!permits(Role::Admin, Action::CastVote));
        assert!(permits(Role::Mentor, Action::CastVote));
        assert!(permits(Role::Team, Action::CastVote));
    }

    #[test]
    fn test_admin_only_actions() {
        for action in [
            Action::ManageRoster,
            Action::CurateCandidates,
            Action::ControlPhase,
            Action::ViewLiveTally,
            Action::ManageState,
        ] {
            assert!(permits(Role::Admin, action));
            assert!(!permits(Role::Mentor, action));
            assert!(!permits(Role::Team, action));
        }
    }

    #[test]
    fn test_member_list_hidden_from_teams() {
        assert!(permits(Role::Mentor, Action::ViewMembers));
        assert!(!permits(Role::Team, Action::ViewMembers));
        assert!(permits(Role::Team, Action::ViewTeams));
        assert!(permits(Role::Team, Action::UploadGame));
        assert!(!permits(Role::Mentor, Action::UploadGame));
    }

    #[test]
    fn test_authorize() {
        assert_eq!(
            authorize(None, Action::LikeGame),
            Err(PortalError::Unauthorized)
        );

        let team = session(Role::Team);
        assert_eq!(
            authorize(Some(&team), Action::ControlPhase),
            Err(PortalError::Forbidden(Action::ControlPhase))
        );
        assert!(authorize(Some(&team), Action::CastVote).is_ok());
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    #[serial]
    fn test_auth_config_requires_both_credentials() {
        std::env::set_var("ADMIN_EMAIL", "admin@example.com");
        std::env::remove_var("ADMIN_PASSWORD");
        let config = AuthConfig::from_env();
        assert!(config.admin_credentials().is_none());

        std::env::set_var("ADMIN_PASSWORD", "  s3cret!  ");
        std::env::set_var("ADMIN_NAME", "Organizers");
        let config = AuthConfig::from_env();
        assert_eq!(
            config.admin_credentials(),
            Some(("admin@example.com", "s3cret!"))
        );
        assert_eq!(config.admin_name, "Organizers");

        std::env::remove_var("ADMIN_EMAIL");
        std::env::remove_var("ADMIN_PASSWORD");
        std::env::remove_var("ADMIN_NAME");
    }
}
