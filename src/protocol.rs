use crate::state::RestartSummary;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    // Browsing (anyone)
    GetSettings,
    ListGames,
    GetGame {
        game_id: SubmissionId,
    },
    ListCandidates,
    GetResults,

    // Signed-in portal actions
    ListMembers,
    ListTeams,
    UploadGame {
        #[serde(flatten)]
        upload: GameUpload,
    },
    LikeGame {
        game_id: SubmissionId,
    },
    CommentGame {
        game_id: SubmissionId,
        content: String,
    },

    // Voter messages
    CastVote {
        candidate_id: CandidateId,
    },
    GetBallot,

    // Admin-only messages
    AdminAddMentor {
        name: String,
        email: String,
        password: String,
    },
    AdminAddTeam {
        name: String,
        email: String,
        password: String,
        #[serde(default)]
        members: Vec<String>,
    },
    AdminListEligibleGames,
    AdminEnrollCandidate {
        submission_id: SubmissionId,
    },
    AdminWithdrawCandidate {
        candidate_id: CandidateId,
    },
    AdminOpenVoting,
    AdminReleaseResults,
    AdminRestartVoting,
    AdminGetLiveTally,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        session: Option<SessionInfo>,
        settings: VotingSettings,
        server_now: String,
    },
    Phase {
        phase: VotingPhase,
        settings: VotingSettings,
    },
    Members {
        list: Vec<Account>,
    },
    Teams {
        list: Vec<Account>,
    },
    AccountCreated {
        account: Account,
    },
    Games {
        list: Vec<GameSummary>,
    },
    Game {
        game: Submission,
    },
    GameUploaded {
        game: Submission,
    },
    GameLiked {
        game_id: SubmissionId,
        likes: usize,
    },
    CommentAdded {
        game_id: SubmissionId,
        comment: Comment,
    },
    /// Public roster view (no vote counts)
    Roster {
        list: Vec<CandidateInfo>,
    },
    EligibleGames {
        list: Vec<GameSummary>,
    },
    CandidateEnrolled {
        candidate: CandidateInfo,
    },
    CandidateWithdrawn {
        candidate_id: CandidateId,
    },
    VoteAck {
        candidate_id: CandidateId,
    },
    Ballot {
        has_voted: bool,
        phase: VotingPhase,
    },
    Results {
        standings: Vec<Standing>,
    },
    /// Admin-only: counts while voting is still open
    LiveTally {
        standings: Vec<Standing>,
        seq: u64,
    },
    RestartComplete {
        summary: RestartSummary,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// Who a connection belongs to (never includes the token)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionInfo {
    pub uid: Uid,
    pub name: String,
    pub role: Role,
}

impl From<&Session> for SessionInfo {
    fn from(s: &Session) -> Self {
        Self {
            uid: s.uid.clone(),
            name: s.name.clone(),
            role: s.role,
        }
    }
}

/// Roster entry as voters see it (no vote set)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateInfo {
    pub id: CandidateId,
    pub source_submission_id: SubmissionId,
    pub display_name: String,
    pub owner_team_name: String,
}

impl From<&CandidateEntry> for CandidateInfo {
    fn from(c: &CandidateEntry) -> Self {
        Self {
            id: c.id.clone(),
            source_submission_id: c.source_submission_id.clone(),
            display_name: c.display_name.clone(),
            owner_team_name: c.owner_team_name.clone(),
        }
    }
}

/// Game card for list views
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSummary {
    pub id: SubmissionId,
    pub display_name: String,
    pub owner_team_name: String,
    pub preview_url: String,
    pub likes: usize,
    pub comments: usize,
}

impl From<&Submission> for GameSummary {
    fn from(s: &Submission) -> Self {
        Self {
            id: s.id.clone(),
            display_name: s.display_name.clone(),
            owner_team_name: s.owner_team_name.clone(),
            preview_url: s.preview_url.clone(),
            likes: s.likes.len(),
            comments: s.comments.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"cast_vote","candidate_id":"c1"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::CastVote { candidate_id } if candidate_id == "c1"));

        let msg: ClientMessage = serde_json::from_str(r#"{"t":"admin_open_voting"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::AdminOpenVoting));
    }

    #[test]
    fn test_upload_fields_are_flat() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"t":"upload_game","name":"Space Cats","description":"Cats","project_id":"42","contributors":["Ada"]}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::UploadGame { upload } => {
                assert_eq!(upload.name, "Space Cats");
                assert_eq!(upload.preview_url, None);
            }
            other => panic!("Expected UploadGame, got {:?}", other),
        }
    }

    #[test]
    fn test_roster_view_hides_votes() {
        let entry = CandidateEntry {
            id: "c1".to_string(),
            source_submission_id: "g1".to_string(),
            display_name: "Space Cats".to_string(),
            owner_team_name: "Pixel Pirates".to_string(),
            votes: ["m1".to_string()].into_iter().collect(),
            enrolled_at: chrono::Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_value(ServerMessage::Roster {
            list: vec![CandidateInfo::from(&entry)],
        })
        .unwrap();
        assert_eq!(json["t"], "roster");
        assert!(json["list"][0].get("votes").is_none());
    }
}
