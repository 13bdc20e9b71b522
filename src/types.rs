use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque ID types for type safety
pub type Uid = String;
pub type SubmissionId = String;
pub type CandidateId = String;
pub type SessionToken = String;

/// Preview shown for uploads that come without an image
pub const DEFAULT_PREVIEW_URL: &str = "/static/default-preview.png";

/// Prefix that turns a project id into a playable link
pub const PROJECT_URL_PREFIX: &str = "https://scratch.mit.edu/projects/";

/// Maximum number of named contributors on an upload
pub const MAX_CONTRIBUTORS: usize = 2;

/// Maximum number of named members on a team account
pub const MAX_TEAM_MEMBERS: usize = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Mentor,
    Team,
}

impl Role {
    /// Mentors and teams may vote, admins run the vote
    pub fn is_voter(&self) -> bool {
        match self {
            Role::Admin => false,
            Role::Mentor | Role::Team => true,
        }
    }

    /// Collection the account record for this role lives in
    pub fn collection(&self) -> AccountCollection {
        match self {
            Role::Admin | Role::Mentor => AccountCollection::Users,
            Role::Team => AccountCollection::Teams,
        }
    }
}

/// Account collections, as selected on the login form
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountCollection {
    Users,
    Teams,
}

/// Which kind of account a login attempt targets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Admins and mentors
    Member,
    Team,
}

impl AccountType {
    pub fn collection(&self) -> AccountCollection {
        match self {
            AccountType::Member => AccountCollection::Users,
            AccountType::Team => AccountCollection::Teams,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VotingPhase {
    Idle,
    Open,
    Closed,
}

/// The single `settings/votingStatus` record every client reads
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VotingSettings {
    pub is_voting_active: bool,
    pub is_results_active: bool,
}

impl VotingSettings {
    pub fn for_phase(phase: VotingPhase) -> Self {
        match phase {
            VotingPhase::Idle => Self {
                is_voting_active: false,
                is_results_active: false,
            },
            VotingPhase::Open => Self {
                is_voting_active: true,
                is_results_active: false,
            },
            VotingPhase::Closed => Self {
                is_voting_active: false,
                is_results_active: true,
            },
        }
    }

    /// An active vote wins over a stale results flag
    pub fn phase(&self) -> VotingPhase {
        match (self.is_voting_active, self.is_results_active) {
            (true, _) => VotingPhase::Open,
            (false, true) => VotingPhase::Closed,
            (false, false) => VotingPhase::Idle,
        }
    }
}

/// Mentor, team or admin record, keyed by the identity provider's uid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub uid: Uid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub members: Vec<String>,
    /// Durable guard against double voting, cleared only by a restart
    #[serde(default)]
    pub voted: bool,
    pub created_at: String,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author_name: String,
    pub author_role: Role,
    pub content: String,
    pub created_at: String,
}

/// An uploaded game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub display_name: String,
    pub description: String,
    pub owner_team_name: String,
    pub preview_url: String,
    pub project_url: String,
    pub contributors: Vec<String>,
    #[serde(default)]
    pub likes: BTreeSet<Uid>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: String,
}

/// Fields a team fills in when uploading a game
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GameUpload {
    pub name: String,
    pub description: String,
    /// Numeric project id, turned into a link with [`PROJECT_URL_PREFIX`]
    pub project_id: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    pub contributors: Vec<String>,
}

/// A submission enrolled in the current voting roster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEntry {
    pub id: CandidateId,
    pub source_submission_id: SubmissionId,
    pub display_name: String,
    pub owner_team_name: String,
    #[serde(default)]
    pub votes: BTreeSet<Uid>,
    pub enrolled_at: String,
}

impl CandidateEntry {
    pub fn from_submission(submission: &Submission) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            source_submission_id: submission.id.clone(),
            display_name: submission.display_name.clone(),
            owner_team_name: submission.owner_team_name.clone(),
            votes: BTreeSet::new(),
            enrolled_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn vote_count(&self) -> u32 {
        self.votes.len() as u32
    }
}

/// One line of the results table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    /// 1-based position; ties keep enrollment order and distinct ranks
    pub rank: u32,
    pub candidate_id: CandidateId,
    pub source_submission_id: SubmissionId,
    pub display_name: String,
    pub owner_team_name: String,
    pub votes: u32,
}

/// An authenticated caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: SessionToken,
    pub uid: Uid,
    pub name: String,
    pub role: Role,
    pub created_at: String,
}
