//! Browsing, rosters and game pages

use crate::error::PortalResult;
use crate::protocol::{CandidateInfo, GameSummary, ServerMessage};
use crate::state::AppState;
use crate::types::*;

pub async fn handle_get_settings(state: &AppState) -> PortalResult<ServerMessage> {
    let settings = state.get_settings().await?;
    Ok(ServerMessage::Phase {
        phase: settings.phase(),
        settings,
    })
}

pub async fn handle_list_games(state: &AppState) -> PortalResult<ServerMessage> {
    let games = state.list_games().await?;
    Ok(ServerMessage::Games {
        list: games.iter().map(GameSummary::from).collect(),
    })
}

pub async fn handle_get_game(state: &AppState, game_id: &str) -> PortalResult<ServerMessage> {
    Ok(ServerMessage::Game {
        game: state.get_game(game_id).await?,
    })
}

pub async fn handle_list_candidates(state: &AppState) -> PortalResult<ServerMessage> {
    let roster = state.list_candidates().await?;
    Ok(ServerMessage::Roster {
        list: roster.iter().map(CandidateInfo::from).collect(),
    })
}

pub async fn handle_get_results(
    state: &AppState,
    session: Option<&Session>,
) -> PortalResult<ServerMessage> {
    Ok(ServerMessage::Results {
        standings: state.results_for(session).await?,
    })
}

pub async fn handle_list_members(state: &AppState) -> PortalResult<ServerMessage> {
    Ok(ServerMessage::Members {
        list: state.list_members().await?,
    })
}

pub async fn handle_list_teams(state: &AppState) -> PortalResult<ServerMessage> {
    Ok(ServerMessage::Teams {
        list: state.list_teams().await?,
    })
}

pub async fn handle_upload_game(
    state: &AppState,
    team: &Session,
    upload: GameUpload,
) -> PortalResult<ServerMessage> {
    let game = state.upload_game(team, upload).await?;
    Ok(ServerMessage::GameUploaded { game })
}

pub async fn handle_like_game(
    state: &AppState,
    caller: &Session,
    game_id: SubmissionId,
) -> PortalResult<ServerMessage> {
    let likes = state.like_game(&game_id, &caller.uid).await?;
    Ok(ServerMessage::GameLiked { game_id, likes })
}

pub async fn handle_comment_game(
    state: &AppState,
    caller: &Session,
    game_id: SubmissionId,
    content: &str,
) -> PortalResult<ServerMessage> {
    let comment = state.comment_on_game(&game_id, caller, content).await?;

    // Other viewers of the game page see new comments live
    let msg = ServerMessage::CommentAdded { game_id, comment };
    state.broadcast_to_all(msg.clone());
    Ok(msg)
}
