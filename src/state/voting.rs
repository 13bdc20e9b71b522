//! Voting lifecycle
//!
//! One global phase (`Idle → Open → Closed`, `restart` back to `Idle`), a
//! roster of enrolled games, and a single vote per mentor or team per cycle.
//!
//! Vote casting writes the vote set first and the voter's `voted` flag second.
//! If the flag write is lost, the vote is still counted exactly once and the
//! next attempt by that voter repairs the flag instead of voting again.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::AppState;
use crate::error::{PortalError, PortalResult, StoreError};
use crate::protocol::{CandidateInfo, ServerMessage};
use crate::store::find_account_anywhere;
use crate::types::*;

/// What a restart cleared
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestartSummary {
    pub candidates_removed: usize,
    pub voters_reset: usize,
}

fn same_team(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Order a roster into standings: most votes first, ties keep roster order
pub fn rank_candidates(mut roster: Vec<CandidateEntry>) -> Vec<Standing> {
    // sort_by is stable, so equal counts stay in enrollment order
    roster.sort_by(|a, b| b.vote_count().cmp(&a.vote_count()));
    roster
        .into_iter()
        .enumerate()
        .map(|(index, c)| Standing {
            rank: index as u32 + 1,
            votes: c.vote_count(),
            candidate_id: c.id,
            source_submission_id: c.source_submission_id,
            display_name: c.display_name,
            owner_team_name: c.owner_team_name,
        })
        .collect()
}

/// Restart sub-steps must surface as an unavailable store, whatever the cause
fn restart_step(step: &str, err: StoreError) -> PortalError {
    tracing::error!("Restart failed while trying to {}: {}", step, err);
    PortalError::StoreUnavailable(format!("restart failed to {}: {}", step, err))
}

impl AppState {
    pub async fn get_settings(&self) -> PortalResult<VotingSettings> {
        Ok(self.store.get_settings().await?)
    }

    pub async fn get_phase(&self) -> PortalResult<VotingPhase> {
        Ok(self.get_settings().await?.phase())
    }

    /// Current roster in enrollment order
    pub async fn list_candidates(&self) -> PortalResult<Vec<CandidateEntry>> {
        Ok(self.store.list_candidates().await?)
    }

    /// Uploaded games not yet on the roster
    pub async fn eligible_submissions(&self) -> PortalResult<Vec<Submission>> {
        let enrolled: HashSet<SubmissionId> = self
            .store
            .list_candidates()
            .await?
            .into_iter()
            .map(|c| c.source_submission_id)
            .collect();
        Ok(self
            .list_games()
            .await?
            .into_iter()
            .filter(|g| !enrolled.contains(&g.id))
            .collect())
    }

    /// Put a submission on the roster with an empty vote set
    pub async fn enroll_candidate(&self, submission: &Submission) -> PortalResult<CandidateEntry> {
        let entry = CandidateEntry::from_submission(submission);
        let entry = match self.store.insert_candidate(entry).await {
            Ok(entry) => entry,
            Err(StoreError::Conflict(_)) => {
                return Err(PortalError::DuplicateCandidate(submission.id.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            "Enrolled {} by {} as candidate {}",
            entry.display_name,
            entry.owner_team_name,
            entry.id
        );
        self.broadcast_roster().await;
        Ok(entry)
    }

    /// Enroll by submission id
    pub async fn enroll_submission(&self, submission_id: &str) -> PortalResult<CandidateEntry> {
        let submission = self.get_game(submission_id).await?;
        self.enroll_candidate(&submission).await
    }

    /// Remove a roster entry. Its votes go with it.
    pub async fn withdraw_candidate(&self, candidate_id: &str) -> PortalResult<()> {
        self.store
            .delete_candidate(candidate_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => {
                    PortalError::NotFound(format!("candidate {}", candidate_id))
                }
                other => other.into(),
            })?;

        tracing::info!("Withdrew candidate {}", candidate_id);
        self.broadcast_roster().await;
        Ok(())
    }

    /// `Idle|Closed → Open`. Re-opening is a no-op. Voter flags and the roster
    /// are left alone.
    pub async fn open_voting(&self) -> PortalResult<VotingSettings> {
        self.set_phase(VotingPhase::Open).await
    }

    /// `Open|Idle → Closed`, making the tally public. Idempotent.
    pub async fn close_voting_and_publish_results(&self) -> PortalResult<VotingSettings> {
        let settings = self.set_phase(VotingPhase::Closed).await?;

        match self.tally().await {
            Ok(standings) => self.broadcast_to_all(ServerMessage::Results { standings }),
            Err(e) => tracing::error!("Results published but tally failed: {}", e),
        }
        Ok(settings)
    }

    /// Start a fresh cycle: phase `Idle`, empty roster, every voter may vote
    /// again.
    ///
    /// The steps are independent writes. The phase goes first so no vote can
    /// land between clearing flags and clearing the roster. If a step fails
    /// the earlier ones stay applied, and running restart again finishes the
    /// job.
    pub async fn restart(&self) -> PortalResult<RestartSummary> {
        tracing::info!("Restarting voting cycle");

        self.store
            .put_settings(VotingSettings::for_phase(VotingPhase::Idle))
            .await
            .map_err(|e| restart_step("reset the phase", e))?;
        self.broadcast_phase(VotingSettings::for_phase(VotingPhase::Idle));

        let candidates_removed = self
            .store
            .clear_candidates()
            .await
            .map_err(|e| restart_step("clear the roster", e))?;
        self.broadcast_roster().await;

        let mentors = self
            .store
            .clear_voted(AccountCollection::Users)
            .await
            .map_err(|e| restart_step("reset member vote flags", e))?;
        let teams = self
            .store
            .clear_voted(AccountCollection::Teams)
            .await
            .map_err(|e| restart_step("reset team vote flags", e))?;

        let summary = RestartSummary {
            candidates_removed,
            voters_reset: mentors + teams,
        };
        tracing::info!(
            "Restart complete: {} candidates removed, {} voters reset",
            summary.candidates_removed,
            summary.voters_reset
        );
        Ok(summary)
    }

    /// Cast the voter's single vote for a candidate.
    ///
    /// Checked in order: voting open, voter not yet voted, candidate exists,
    /// candidate not owned by a team with the voter's name.
    pub async fn cast_vote(&self, voter_uid: &str, candidate_id: &str) -> PortalResult<()> {
        if self.get_phase().await? != VotingPhase::Open {
            return Err(PortalError::VotingClosed);
        }

        let voter = find_account_anywhere(self.store.as_ref(), voter_uid)
            .await?
            .filter(|a| a.role.is_voter())
            .ok_or_else(|| PortalError::NotFound(format!("voter {}", voter_uid)))?;
        if voter.voted {
            return Err(PortalError::AlreadyVoted);
        }

        let roster = self.store.list_candidates().await?;

        // A vote without a flag means an earlier attempt died between the two
        // writes. Finish that attempt instead of voting a second time.
        if let Some(previous) = roster.iter().find(|c| c.votes.contains(&voter.uid)) {
            tracing::warn!(
                "Voter {} already in vote set of {} without flag, repairing",
                voter.uid,
                previous.id
            );
            self.store
                .set_voted(voter.role.collection(), &voter.uid, true)
                .await?;
            return if previous.id == candidate_id {
                Ok(())
            } else {
                Err(PortalError::AlreadyVoted)
            };
        }

        let candidate = roster
            .iter()
            .find(|c| c.id == candidate_id)
            .ok_or_else(|| PortalError::NotFound(format!("candidate {}", candidate_id)))?;
        // Any voter, mentor or team, is matched by name against the owner
        if same_team(&voter.name, &candidate.owner_team_name) {
            return Err(PortalError::SelfVoteForbidden);
        }

        // Vote set first, flag second
        let added = self.store.add_vote(&candidate.id, &voter.uid).await?;
        if !added {
            tracing::debug!("Vote by {} for {} was already recorded", voter.uid, candidate.id);
        }
        self.store
            .set_voted(voter.role.collection(), &voter.uid, true)
            .await?;

        tracing::info!("{} voted for {}", voter.name, candidate.display_name);
        Ok(())
    }

    /// Whether the voter has used their vote this cycle
    pub async fn ballot(&self, voter_uid: &str) -> PortalResult<bool> {
        find_account_anywhere(self.store.as_ref(), voter_uid)
            .await?
            .map(|a| a.voted)
            .ok_or_else(|| PortalError::NotFound(format!("voter {}", voter_uid)))
    }

    /// Roster ranked by votes. Available in every phase; who may see it is
    /// decided by [`AppState::results_for`].
    pub async fn tally(&self) -> PortalResult<Vec<Standing>> {
        Ok(rank_candidates(self.store.list_candidates().await?))
    }

    /// Results as the caller is allowed to see them: everyone once results are
    /// released, admins at any time.
    pub async fn results_for(&self, viewer: Option<&Session>) -> PortalResult<Vec<Standing>> {
        let is_admin = viewer.is_some_and(|s| s.role == Role::Admin);
        if !is_admin && self.get_phase().await? != VotingPhase::Closed {
            return Err(PortalError::ResultsHidden);
        }
        self.tally().await
    }

    async fn set_phase(&self, phase: VotingPhase) -> PortalResult<VotingSettings> {
        let current = self.store.get_settings().await?;
        let settings = VotingSettings::for_phase(phase);
        if current == settings {
            tracing::debug!("Phase already {:?}", phase);
            return Ok(settings);
        }

        self.store.put_settings(settings).await?;
        tracing::info!("Voting phase {:?} -> {:?}", current.phase(), phase);
        self.broadcast_phase(settings);
        Ok(settings)
    }

    fn broadcast_phase(&self, settings: VotingSettings) {
        self.broadcast_to_all(ServerMessage::Phase {
            phase: settings.phase(),
            settings,
        });
    }

    /// Re-read the roster from the store and push it to all clients
    async fn broadcast_roster(&self) {
        match self.store.list_candidates().await {
            Ok(roster) => self.broadcast_to_all(ServerMessage::Roster {
                list: roster.iter().map(CandidateInfo::from).collect(),
            }),
            Err(e) => tracing::warn!("Could not re-read roster for broadcast: {}", e),
        }
    }
}
