use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentStore, StoreDump};
use crate::error::{StoreError, StoreResult};
use crate::types::*;

/// In-process document store. Each collection sits behind its own lock and
/// every primitive mutates one document while holding it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: RwLock<VotingSettings>,
    users: RwLock<Vec<Account>>,
    teams: RwLock<Vec<Account>>,
    games: RwLock<Vec<Submission>>,
    voting: RwLock<Vec<CandidateEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn accounts(&self, collection: AccountCollection) -> &RwLock<Vec<Account>> {
        match collection {
            AccountCollection::Users => &self.users,
            AccountCollection::Teams => &self.teams,
        }
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_settings(&self) -> StoreResult<VotingSettings> {
        Ok(*self.settings.read().await)
    }

    async fn put_settings(&self, settings: VotingSettings) -> StoreResult<()> {
        *self.settings.write().await = settings;
        Ok(())
    }

    async fn insert_candidate(&self, entry: CandidateEntry) -> StoreResult<CandidateEntry> {
        let mut voting = self.voting.write().await;
        if voting
            .iter()
            .any(|c| c.source_submission_id == entry.source_submission_id)
        {
            return Err(StoreError::Conflict(format!(
                "voting/{}",
                entry.source_submission_id
            )));
        }
        voting.push(entry.clone());
        Ok(entry)
    }

    async fn get_candidate(&self, id: &str) -> StoreResult<Option<CandidateEntry>> {
        Ok(self
            .voting
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn list_candidates(&self) -> StoreResult<Vec<CandidateEntry>> {
        Ok(self.voting.read().await.clone())
    }

    async fn delete_candidate(&self, id: &str) -> StoreResult<()> {
        let mut voting = self.voting.write().await;
        let before = voting.len();
        voting.retain(|c| c.id != id);
        if voting.len() == before {
            return Err(StoreError::NotFound(format!("voting/{}", id)));
        }
        Ok(())
    }

    async fn add_vote(&self, candidate_id: &str, voter: &str) -> StoreResult<bool> {
        let mut voting = self.voting.write().await;
        let candidate = voting
            .iter_mut()
            .find(|c| c.id == candidate_id)
            .ok_or_else(|| StoreError::NotFound(format!("voting/{}", candidate_id)))?;
        Ok(candidate.votes.insert(voter.to_string()))
    }

    async fn clear_candidates(&self) -> StoreResult<usize> {
        let mut voting = self.voting.write().await;
        let removed = voting.len();
        voting.clear();
        Ok(removed)
    }

    async fn insert_account(&self, account: Account) -> StoreResult<()> {
        // Lock both collections in a fixed order so uniqueness holds across them
        let mut users = self.users.write().await;
        let mut teams = self.teams.write().await;

        let clash = users.iter().chain(teams.iter()).find(|a| {
            a.uid == account.uid || a.email.eq_ignore_ascii_case(&account.email)
        });
        if let Some(existing) = clash {
            return Err(StoreError::Conflict(if existing.uid == account.uid {
                format!("account uid {}", account.uid)
            } else {
                format!("account email {}", account.email)
            }));
        }

        match account.role.collection() {
            AccountCollection::Users => users.push(account),
            AccountCollection::Teams => {
                if teams.iter().any(|t| same_name(&t.name, &account.name)) {
                    return Err(StoreError::Conflict(format!("team name {}", account.name)));
                }
                teams.push(account)
            }
        }
        Ok(())
    }

    async fn find_account(
        &self,
        collection: AccountCollection,
        uid: &str,
    ) -> StoreResult<Option<Account>> {
        Ok(self
            .accounts(collection)
            .read()
            .await
            .iter()
            .find(|a| a.uid == uid)
            .cloned())
    }

    async fn list_accounts(&self, collection: AccountCollection) -> StoreResult<Vec<Account>> {
        Ok(self.accounts(collection).read().await.clone())
    }

    async fn set_voted(
        &self,
        collection: AccountCollection,
        uid: &str,
        voted: bool,
    ) -> StoreResult<()> {
        let mut accounts = self.accounts(collection).write().await;
        let account = accounts
            .iter_mut()
            .find(|a| a.uid == uid)
            .ok_or_else(|| StoreError::NotFound(format!("account {}", uid)))?;
        account.voted = voted;
        Ok(())
    }

    async fn clear_voted(&self, collection: AccountCollection) -> StoreResult<usize> {
        let mut accounts = self.accounts(collection).write().await;
        let mut changed = 0;
        for account in accounts.iter_mut().filter(|a| a.voted) {
            account.voted = false;
            changed += 1;
        }
        Ok(changed)
    }

    async fn insert_submission(&self, submission: Submission) -> StoreResult<()> {
        let mut games = self.games.write().await;
        if games.iter().any(|g| g.id == submission.id) {
            return Err(StoreError::Conflict(format!("games/{}", submission.id)));
        }
        games.push(submission);
        Ok(())
    }

    async fn get_submission(&self, id: &str) -> StoreResult<Option<Submission>> {
        Ok(self
            .games
            .read()
            .await
            .iter()
            .find(|g| g.id == id)
            .cloned())
    }

    async fn list_submissions(&self) -> StoreResult<Vec<Submission>> {
        Ok(self.games.read().await.clone())
    }

    async fn add_like(&self, submission_id: &str, uid: &str) -> StoreResult<usize> {
        let mut games = self.games.write().await;
        let game = games
            .iter_mut()
            .find(|g| g.id == submission_id)
            .ok_or_else(|| StoreError::NotFound(format!("games/{}", submission_id)))?;
        game.likes.insert(uid.to_string());
        Ok(game.likes.len())
    }

    async fn append_comment(&self, submission_id: &str, comment: Comment) -> StoreResult<()> {
        let mut games = self.games.write().await;
        let game = games
            .iter_mut()
            .find(|g| g.id == submission_id)
            .ok_or_else(|| StoreError::NotFound(format!("games/{}", submission_id)))?;
        game.comments.push(comment);
        Ok(())
    }

    async fn dump(&self) -> StoreResult<StoreDump> {
        Ok(StoreDump {
            settings: *self.settings.read().await,
            users: self.users.read().await.clone(),
            teams: self.teams.read().await.clone(),
            games: self.games.read().await.clone(),
            voting: self.voting.read().await.clone(),
        })
    }

    async fn load(&self, dump: StoreDump) -> StoreResult<()> {
        *self.settings.write().await = dump.settings;
        *self.users.write().await = dump.users;
        *self.teams.write().await = dump.teams;
        *self.games.write().await = dump.games;
        *self.voting.write().await = dump.voting;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn account(uid: &str, name: &str, role: Role) -> Account {
        Account {
            uid: uid.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", uid),
            role,
            members: vec![],
            voted: false,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn candidate(source: &str) -> CandidateEntry {
        CandidateEntry {
            id: ulid::Ulid::new().to_string(),
            source_submission_id: source.to_string(),
            display_name: format!("Game {}", source),
            owner_team_name: "Team".to_string(),
            votes: BTreeSet::new(),
            enrolled_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_settings_default_to_idle() {
        let store = MemoryStore::new();
        let settings = store.get_settings().await.unwrap();
        assert_eq!(settings.phase(), VotingPhase::Idle);
    }

    #[tokio::test]
    async fn test_candidate_source_is_unique() {
        let store = MemoryStore::new();
        store.insert_candidate(candidate("g1")).await.unwrap();

        let result = store.insert_candidate(candidate("g1")).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.list_candidates().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_roster_keeps_insertion_order() {
        let store = MemoryStore::new();
        for source in ["c", "a", "b"] {
            store.insert_candidate(candidate(source)).await.unwrap();
        }
        let order: Vec<_> = store
            .list_candidates()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.source_submission_id)
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_add_vote_is_idempotent() {
        let store = MemoryStore::new();
        let entry = store.insert_candidate(candidate("g1")).await.unwrap();

        assert!(store.add_vote(&entry.id, "m1").await.unwrap());
        assert!(!store.add_vote(&entry.id, "m1").await.unwrap());

        let stored = store.get_candidate(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.vote_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_from_one_voter_count_once() {
        let store = Arc::new(MemoryStore::new());
        let entry = store.insert_candidate(candidate("g1")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let id = entry.id.clone();
            handles.push(tokio::spawn(
                async move { store.add_vote(&id, "m1").await },
            ));
        }
        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        let stored = store.get_candidate(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.vote_count(), 1);
    }

    #[tokio::test]
    async fn test_add_vote_unknown_candidate() {
        let store = MemoryStore::new();
        let result = store.add_vote("missing", "m1").await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_candidate() {
        let store = MemoryStore::new();
        let entry = store.insert_candidate(candidate("g1")).await.unwrap();

        store.delete_candidate(&entry.id).await.unwrap();
        assert!(store.get_candidate(&entry.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_candidate(&entry.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_accounts_land_in_role_collection() {
        let store = MemoryStore::new();
        store
            .insert_account(account("m1", "Mia", Role::Mentor))
            .await
            .unwrap();
        store
            .insert_account(account("t1", "Pixel Pirates", Role::Team))
            .await
            .unwrap();

        assert!(store
            .find_account(AccountCollection::Users, "m1")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_account(AccountCollection::Users, "t1")
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            store
                .list_accounts(AccountCollection::Teams)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_account_uniqueness() {
        let store = MemoryStore::new();
        store
            .insert_account(account("t1", "Pixel Pirates", Role::Team))
            .await
            .unwrap();

        // Same team name, different case
        let result = store
            .insert_account(account("t2", "pixel pirates", Role::Team))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        // Same email in the other collection
        let mut mentor = account("m1", "Mia", Role::Mentor);
        mentor.email = "T1@example.com".to_string();
        let result = store.insert_account(mentor).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_clear_voted() {
        let store = MemoryStore::new();
        store
            .insert_account(account("m1", "Mia", Role::Mentor))
            .await
            .unwrap();
        store
            .insert_account(account("m2", "Max", Role::Mentor))
            .await
            .unwrap();
        store
            .set_voted(AccountCollection::Users, "m1", true)
            .await
            .unwrap();

        assert_eq!(
            store.clear_voted(AccountCollection::Users).await.unwrap(),
            1
        );
        let m1 = store
            .find_account(AccountCollection::Users, "m1")
            .await
            .unwrap()
            .unwrap();
        assert!(!m1.voted);
    }

    #[tokio::test]
    async fn test_dump_and_load() {
        let store = MemoryStore::new();
        store
            .put_settings(VotingSettings::for_phase(VotingPhase::Open))
            .await
            .unwrap();
        store.insert_candidate(candidate("g1")).await.unwrap();

        let dump = store.dump().await.unwrap();
        let restored = MemoryStore::new();
        restored.load(dump.clone()).await.unwrap();

        assert_eq!(restored.dump().await.unwrap(), dump);
        assert_eq!(
            restored.get_settings().await.unwrap().phase(),
            VotingPhase::Open
        );
    }
}
