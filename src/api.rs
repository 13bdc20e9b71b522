//! HTTP API endpoints.
//!
//! Login/logout hand out the bearer tokens the WebSocket and the admin
//! endpoints expect. Everything else a client does goes over `/ws`.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{authorize, Action, CurrentSession, MaybeSession};
use crate::error::PortalResult;
use crate::protocol::SessionInfo;
use crate::state::export::PortalSnapshot;
use crate::state::AppState;
use crate::types::*;
use crate::ws;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub account_type: AccountType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: SessionToken,
    pub session: SessionInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub phase: VotingPhase,
    #[serde(flatten)]
    pub settings: VotingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub standings: Vec<Standing>,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/settings", get(get_settings))
        .route("/api/results", get(get_results))
        .route("/api/state/export", get(export_state))
        .route("/api/state/import", post(import_state))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Sign in as a member (admin/mentor) or a team.
///
/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> PortalResult<Json<LoginResponse>> {
    let session = state
        .login(&req.email, &req.password, req.account_type)
        .await?;
    Ok(Json(LoginResponse {
        session: SessionInfo::from(&session),
        token: session.token,
    }))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
) -> StatusCode {
    state.logout(&session.token).await;
    StatusCode::NO_CONTENT
}

/// GET /api/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> PortalResult<Json<SettingsResponse>> {
    let settings = state.get_settings().await?;
    Ok(Json(SettingsResponse {
        phase: settings.phase(),
        settings,
    }))
}

/// Published results. Admins may look before they are released.
///
/// GET /api/results
pub async fn get_results(
    State(state): State<Arc<AppState>>,
    MaybeSession(session): MaybeSession,
) -> PortalResult<Json<ResultsResponse>> {
    let standings = state.results_for(session.as_ref()).await?;
    Ok(Json(ResultsResponse { standings }))
}

/// Export the entire portal state as JSON.
///
/// GET /api/state/export
pub async fn export_state(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
) -> PortalResult<Json<PortalSnapshot>> {
    authorize(Some(&session), Action::ManageState)?;
    Ok(Json(state.export_state().await?))
}

/// Import a snapshot, replacing all current state.
///
/// POST /api/state/import
pub async fn import_state(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Json(snapshot): Json<PortalSnapshot>,
) -> PortalResult<StatusCode> {
    authorize(Some(&session), Action::ManageState)?;
    state.import_state(snapshot).await.inspect_err(|e| {
        tracing::error!("State import failed: {}", e);
    })?;
    Ok(StatusCode::NO_CONTENT)
}
