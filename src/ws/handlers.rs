//! WebSocket message dispatch
//!
//! This module provides the main entry point for handling client messages.
//! Authorization is checked here, then dispatched to the handler modules.

use crate::auth::{authorize, Action};
use crate::error::PortalResult;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Session;
use std::sync::Arc;

use super::{admin, portal, voter};

/// Resolve the caller for `$action` or return the error frame
macro_rules! require {
    ($session:expr, $action:expr) => {
        match authorize($session, $action) {
            Ok(session) => session,
            Err(e) => return Some(e.to_message()),
        }
    };
}

/// Turn a handler result into the frame sent back to the caller
fn respond(result: PortalResult<ServerMessage>) -> Option<ServerMessage> {
    Some(result.unwrap_or_else(|e| e.to_message()))
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    session: Option<&Session>,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        // Browsing, open to anonymous callers
        ClientMessage::GetSettings => respond(portal::handle_get_settings(state).await),

        ClientMessage::ListGames => respond(portal::handle_list_games(state).await),

        ClientMessage::GetGame { game_id } => {
            respond(portal::handle_get_game(state, &game_id).await)
        }

        ClientMessage::ListCandidates => respond(portal::handle_list_candidates(state).await),

        ClientMessage::GetResults => respond(portal::handle_get_results(state, session).await),

        // Signed-in portal actions
        ClientMessage::ListMembers => {
            require!(session, Action::ViewMembers);
            respond(portal::handle_list_members(state).await)
        }

        ClientMessage::ListTeams => {
            require!(session, Action::ViewTeams);
            respond(portal::handle_list_teams(state).await)
        }

        ClientMessage::UploadGame { upload } => {
            let team = require!(session, Action::UploadGame);
            respond(portal::handle_upload_game(state, team, upload).await)
        }

        ClientMessage::LikeGame { game_id } => {
            let caller = require!(session, Action::LikeGame);
            respond(portal::handle_like_game(state, caller, game_id).await)
        }

        ClientMessage::CommentGame { game_id, content } => {
            let caller = require!(session, Action::CommentGame);
            respond(portal::handle_comment_game(state, caller, game_id, &content).await)
        }

        // Voter messages
        ClientMessage::CastVote { candidate_id } => {
            let voter = require!(session, Action::CastVote);
            respond(voter::handle_cast_vote(state, voter, candidate_id).await)
        }

        ClientMessage::GetBallot => {
            let voter = require!(session, Action::CastVote);
            respond(voter::handle_get_ballot(state, voter).await)
        }

        // Admin messages
        ClientMessage::AdminAddMentor {
            name,
            email,
            password,
        } => {
            require!(session, Action::ManageRoster);
            respond(admin::handle_add_mentor(state, &name, &email, &password).await)
        }

        ClientMessage::AdminAddTeam {
            name,
            email,
            password,
            members,
        } => {
            require!(session, Action::ManageRoster);
            respond(admin::handle_add_team(state, &name, &email, &password, members).await)
        }

        ClientMessage::AdminListEligibleGames => {
            require!(session, Action::CurateCandidates);
            respond(admin::handle_list_eligible(state).await)
        }

        ClientMessage::AdminEnrollCandidate { submission_id } => {
            require!(session, Action::CurateCandidates);
            respond(admin::handle_enroll_candidate(state, &submission_id).await)
        }

        ClientMessage::AdminWithdrawCandidate { candidate_id } => {
            require!(session, Action::CurateCandidates);
            respond(admin::handle_withdraw_candidate(state, candidate_id).await)
        }

        ClientMessage::AdminOpenVoting => {
            require!(session, Action::ControlPhase);
            respond(admin::handle_open_voting(state).await)
        }

        ClientMessage::AdminReleaseResults => {
            require!(session, Action::ControlPhase);
            respond(admin::handle_release_results(state).await)
        }

        ClientMessage::AdminRestartVoting => {
            require!(session, Action::ControlPhase);
            respond(admin::handle_restart_voting(state).await)
        }

        ClientMessage::AdminGetLiveTally => {
            require!(session, Action::ViewLiveTally);
            respond(admin::handle_live_tally(state).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::*;
    use crate::types::*;

    fn error_code(msg: Option<ServerMessage>) -> String {
        match msg {
            Some(ServerMessage::Error { code, .. }) => code,
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_anonymous_can_browse_only() {
        let state = Arc::new(AppState::new());

        let result = handle_message(ClientMessage::ListGames, None, &state).await;
        assert!(matches!(result, Some(ServerMessage::Games { .. })));

        let result = handle_message(
            ClientMessage::LikeGame {
                game_id: "g1".to_string(),
            },
            None,
            &state,
        )
        .await;
        assert_eq!(error_code(result), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_admin_commands_need_admin() {
        let (state, _) = state_with_admin().await;
        let state = Arc::new(state);
        let mentor = mentor_session(&state, "Mia").await;
        let team = team_session(&state, "Pixel Pirates").await;

        for session in [&mentor, &team] {
            for msg in [
                ClientMessage::AdminOpenVoting,
                ClientMessage::AdminRestartVoting,
                ClientMessage::AdminGetLiveTally,
                ClientMessage::AdminListEligibleGames,
            ] {
                let result = handle_message(msg, Some(session), &state).await;
                assert_eq!(error_code(result), "FORBIDDEN");
            }
        }
        assert_eq!(state.get_phase().await.unwrap(), VotingPhase::Idle);
    }

    #[tokio::test]
    async fn test_teams_cannot_list_members() {
        let (state, _) = state_with_admin().await;
        let state = Arc::new(state);
        let team = team_session(&state, "Pixel Pirates").await;
        let mentor = mentor_session(&state, "Mia").await;

        let result = handle_message(ClientMessage::ListMembers, Some(&team), &state).await;
        assert_eq!(error_code(result), "FORBIDDEN");

        let result = handle_message(ClientMessage::ListMembers, Some(&mentor), &state).await;
        match result {
            Some(ServerMessage::Members { list }) => assert_eq!(list.len(), 2),
            other => panic!("Expected Members, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_admin_cannot_vote() {
        let (state, admin) = state_with_admin().await;
        let state = Arc::new(state);
        state.open_voting().await.unwrap();

        let result = handle_message(
            ClientMessage::CastVote {
                candidate_id: "c1".to_string(),
            },
            Some(&admin),
            &state,
        )
        .await;
        assert_eq!(error_code(result), "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_vote_flow() {
        let (state, admin) = state_with_admin().await;
        let state = Arc::new(state);
        let owner = team_session(&state, "Owners").await;
        let mentor = mentor_session(&state, "Mia").await;
        let game = upload(&state, &owner, "Space Cats").await;

        let candidate_id = match handle_message(
            ClientMessage::AdminEnrollCandidate {
                submission_id: game.id.clone(),
            },
            Some(&admin),
            &state,
        )
        .await
        {
            Some(ServerMessage::CandidateEnrolled { candidate }) => candidate.id,
            other => panic!("Expected CandidateEnrolled, got {:?}", other),
        };

        let vote = ClientMessage::CastVote {
            candidate_id: candidate_id.clone(),
        };
        assert_eq!(
            error_code(handle_message(vote.clone(), Some(&mentor), &state).await),
            "VOTING_CLOSED"
        );

        handle_message(ClientMessage::AdminOpenVoting, Some(&admin), &state).await;
        assert!(matches!(
            handle_message(vote.clone(), Some(&mentor), &state).await,
            Some(ServerMessage::VoteAck { .. })
        ));
        assert_eq!(
            error_code(handle_message(vote, Some(&mentor), &state).await),
            "ALREADY_VOTED"
        );

        match handle_message(ClientMessage::GetBallot, Some(&mentor), &state).await {
            Some(ServerMessage::Ballot { has_voted, phase }) => {
                assert!(has_voted);
                assert_eq!(phase, VotingPhase::Open);
            }
            other => panic!("Expected Ballot, got {:?}", other),
        }

        assert_eq!(
            error_code(handle_message(ClientMessage::GetResults, Some(&mentor), &state).await),
            "RESULTS_HIDDEN"
        );
        handle_message(ClientMessage::AdminReleaseResults, Some(&admin), &state).await;
        match handle_message(ClientMessage::GetResults, None, &state).await {
            Some(ServerMessage::Results { standings }) => {
                assert_eq!(standings.len(), 1);
                assert_eq!(standings[0].votes, 1);
            }
            other => panic!("Expected Results, got {:?}", other),
        }
    }
}
