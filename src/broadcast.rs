use crate::protocol::ServerMessage;
use crate::state::export::save_snapshot;
use crate::state::AppState;
use crate::types::VotingPhase;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const LIVE_TALLY_INTERVAL: Duration = Duration::from_secs(2);

/// Build the next live tally frame, or None unless voting is open
pub async fn live_tally_frame(state: &AppState, seq: u64) -> Option<ServerMessage> {
    match state.get_phase().await {
        Ok(VotingPhase::Open) => {}
        Ok(_) => return None,
        Err(e) => {
            tracing::warn!("Live tally skipped, phase unavailable: {}", e);
            return None;
        }
    }

    match state.tally().await {
        Ok(standings) => Some(ServerMessage::LiveTally { standings, seq }),
        Err(e) => {
            tracing::warn!("Live tally skipped: {}", e);
            None
        }
    }
}

/// Spawn a background task that pushes vote counts to admins while voting is open
pub fn spawn_live_tally_broadcaster(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut seq = 0u64;

        loop {
            tokio::time::sleep(LIVE_TALLY_INTERVAL).await;

            // Nobody is watching
            if state.admin_broadcast.receiver_count() == 0 {
                continue;
            }

            if let Some(msg) = live_tally_frame(&state, seq + 1).await {
                seq += 1;
                state.broadcast_to_admin(msg);
            }
        }
    });
}

/// Spawn a background task that writes a snapshot every `interval`
pub fn spawn_snapshot_writer(state: Arc<AppState>, path: PathBuf, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately, right after startup's own load
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = save_snapshot(&state, &path).await {
                tracing::error!("Periodic snapshot to {} failed: {}", path.display(), e);
            }
        }
    });
}
