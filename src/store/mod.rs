//! Document store seam.
//!
//! The portal keeps no authoritative state of its own: settings, accounts,
//! games and the voting roster all live in a document store. Every method here
//! is a single-document primitive that the store applies atomically, so
//! concurrent sessions never need a read-modify-write cycle.

mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::types::*;

pub use memory::MemoryStore;

/// Full copy of every collection, used for backups and snapshots
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreDump {
    pub settings: VotingSettings,
    pub users: Vec<Account>,
    pub teams: Vec<Account>,
    pub games: Vec<Submission>,
    pub voting: Vec<CandidateEntry>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    // settings/votingStatus

    async fn get_settings(&self) -> StoreResult<VotingSettings>;

    async fn put_settings(&self, settings: VotingSettings) -> StoreResult<()>;

    // voting roster

    /// Append a roster entry. Fails with `Conflict` if an entry for the same
    /// source submission already exists.
    async fn insert_candidate(&self, entry: CandidateEntry) -> StoreResult<CandidateEntry>;

    async fn get_candidate(&self, id: &str) -> StoreResult<Option<CandidateEntry>>;

    /// Roster in insertion order
    async fn list_candidates(&self) -> StoreResult<Vec<CandidateEntry>>;

    async fn delete_candidate(&self, id: &str) -> StoreResult<()>;

    /// Idempotent add of `voter` to the candidate's vote set.
    /// Returns false when the voter was already present.
    async fn add_vote(&self, candidate_id: &str, voter: &str) -> StoreResult<bool>;

    /// Delete every roster entry, returning how many were removed
    async fn clear_candidates(&self) -> StoreResult<usize>;

    // users / teams

    /// Insert an account into the collection of its role. Uid and email are
    /// unique across the store, team names are unique (ignoring case).
    async fn insert_account(&self, account: Account) -> StoreResult<()>;

    async fn find_account(
        &self,
        collection: AccountCollection,
        uid: &str,
    ) -> StoreResult<Option<Account>>;

    /// Accounts in creation order
    async fn list_accounts(&self, collection: AccountCollection) -> StoreResult<Vec<Account>>;

    async fn set_voted(
        &self,
        collection: AccountCollection,
        uid: &str,
        voted: bool,
    ) -> StoreResult<()>;

    /// Reset `voted` on every account of a collection, returning how many changed
    async fn clear_voted(&self, collection: AccountCollection) -> StoreResult<usize>;

    // games

    async fn insert_submission(&self, submission: Submission) -> StoreResult<()>;

    async fn get_submission(&self, id: &str) -> StoreResult<Option<Submission>>;

    /// Games in upload order
    async fn list_submissions(&self) -> StoreResult<Vec<Submission>>;

    /// Idempotent add to the like set, returning the new like count
    async fn add_like(&self, submission_id: &str, uid: &str) -> StoreResult<usize>;

    async fn append_comment(&self, submission_id: &str, comment: Comment) -> StoreResult<()>;

    // backup

    async fn dump(&self) -> StoreResult<StoreDump>;

    /// Replace every collection with the dump's contents
    async fn load(&self, dump: StoreDump) -> StoreResult<()>;
}

/// Look an account up in both collections
pub async fn find_account_anywhere(
    store: &dyn DocumentStore,
    uid: &str,
) -> StoreResult<Option<Account>> {
    if let Some(account) = store.find_account(AccountCollection::Users, uid).await? {
        return Ok(Some(account));
    }
    store.find_account(AccountCollection::Teams, uid).await
}
