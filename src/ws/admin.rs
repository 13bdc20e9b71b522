//! Admin handlers: rosters, candidate curation and the voting phase

use crate::error::PortalResult;
use crate::protocol::{CandidateInfo, GameSummary, ServerMessage};
use crate::state::AppState;
use crate::types::*;

pub async fn handle_add_mentor(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
) -> PortalResult<ServerMessage> {
    let account = state.add_mentor(name, email, password).await?;
    Ok(ServerMessage::AccountCreated { account })
}

pub async fn handle_add_team(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
    members: Vec<String>,
) -> PortalResult<ServerMessage> {
    let account = state.add_team(name, email, password, members).await?;
    Ok(ServerMessage::AccountCreated { account })
}

pub async fn handle_list_eligible(state: &AppState) -> PortalResult<ServerMessage> {
    let games = state.eligible_submissions().await?;
    Ok(ServerMessage::EligibleGames {
        list: games.iter().map(GameSummary::from).collect(),
    })
}

pub async fn handle_enroll_candidate(
    state: &AppState,
    submission_id: &str,
) -> PortalResult<ServerMessage> {
    let entry = state.enroll_submission(submission_id).await?;
    Ok(ServerMessage::CandidateEnrolled {
        candidate: CandidateInfo::from(&entry),
    })
}

pub async fn handle_withdraw_candidate(
    state: &AppState,
    candidate_id: CandidateId,
) -> PortalResult<ServerMessage> {
    state.withdraw_candidate(&candidate_id).await?;
    Ok(ServerMessage::CandidateWithdrawn { candidate_id })
}

pub async fn handle_open_voting(state: &AppState) -> PortalResult<ServerMessage> {
    let settings = state.open_voting().await?;
    Ok(ServerMessage::Phase {
        phase: settings.phase(),
        settings,
    })
}

pub async fn handle_release_results(state: &AppState) -> PortalResult<ServerMessage> {
    let settings = state.close_voting_and_publish_results().await?;
    Ok(ServerMessage::Phase {
        phase: settings.phase(),
        settings,
    })
}

pub async fn handle_restart_voting(state: &AppState) -> PortalResult<ServerMessage> {
    let summary = state.restart().await?;
    Ok(ServerMessage::RestartComplete { summary })
}

/// On-demand tally. The periodic broadcaster numbers its frames, this one
/// always carries seq 0.
pub async fn handle_live_tally(state: &AppState) -> PortalResult<ServerMessage> {
    Ok(ServerMessage::LiveTally {
        standings: state.tally().await?,
        seq: 0,
    })
}
