use crate::error::PortalResult;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::*;

pub async fn handle_cast_vote(
    state: &AppState,
    voter: &Session,
    candidate_id: CandidateId,
) -> PortalResult<ServerMessage> {
    state.cast_vote(&voter.uid, &candidate_id).await?;
    Ok(ServerMessage::VoteAck { candidate_id })
}

pub async fn handle_get_ballot(state: &AppState, voter: &Session) -> PortalResult<ServerMessage> {
    let has_voted = state.ballot(&voter.uid).await?;
    let phase = state.get_phase().await?;
    Ok(ServerMessage::Ballot { has_voted, phase })
}
