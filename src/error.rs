//! Error types shared by the controller, the HTTP API and the WebSocket layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::Action;
use crate::protocol::ServerMessage;

/// Result type for portal operations
pub type PortalResult<T> = Result<T, PortalError>;

/// Result type for document store primitives
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a document store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A unique key (roster source submission, account uid, ...) already exists
    #[error("Document already exists: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Everything a portal operation can fail with
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortalError {
    #[error("Submission {0} is already enrolled for voting")]
    DuplicateCandidate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Reserved: phase transitions are idempotent and never produce this
    #[error("Invalid phase transition: {0}")]
    InvalidTransition(String),

    #[error("Voting is not open")]
    VotingClosed,

    #[error("You have already voted")]
    AlreadyVoted,

    #[error("Teams cannot vote for their own game")]
    SelfVoteForbidden,

    #[error("Results have not been released yet")]
    ResultsHidden,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No {0} account exists for this login")]
    AccountNotFound(String),

    #[error("Sign in required")]
    Unauthorized,

    #[error("Not allowed to {0}")]
    Forbidden(Action),

    #[error("{0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl PortalError {
    /// Stable machine-readable code, used in HTTP bodies and WebSocket errors
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DuplicateCandidate(_) => "DUPLICATE_CANDIDATE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::VotingClosed => "VOTING_CLOSED",
            Self::AlreadyVoted => "ALREADY_VOTED",
            Self::SelfVoteForbidden => "SELF_VOTE_FORBIDDEN",
            Self::ResultsHidden => "RESULTS_HIDDEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateCandidate(_) | Self::Conflict(_) | Self::InvalidTransition(_) => {
                StatusCode::CONFLICT
            }
            Self::VotingClosed | Self::AlreadyVoted | Self::SelfVoteForbidden => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::ResultsHidden | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidCredentials | Self::AccountNotFound(_) | Self::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Convert into the WebSocket error frame
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Error {
            code: self.code().to_string(),
            msg: self.to_string(),
        }
    }
}

impl From<StoreError> for PortalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => PortalError::NotFound(what),
            StoreError::Conflict(what) => PortalError::Conflict(what),
            StoreError::Unavailable(reason) => PortalError::StoreUnavailable(reason),
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        if status.is_server_error() {
            tracing::error!(error = %self, code = code, "Request failed");
        } else {
            tracing::debug!(error = %self, code = code, "Request rejected");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}
