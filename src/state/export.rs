//! State export/import and on-disk snapshots.
//!
//! A snapshot holds everything the document store and the identity provider
//! know. Sessions and broadcast channels are runtime-only and not exported.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::{PortalError, PortalResult};
use crate::identity::CredentialRecord;
use crate::protocol::ServerMessage;
use crate::store::StoreDump;
use crate::types::*;

/// Schema version for export format compatibility
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

/// A serializable snapshot of the portal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortalSnapshot {
    /// Schema version for forward compatibility
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    pub store: StoreDump,
    /// Salted password hashes, one per account
    #[serde(default)]
    pub credentials: Vec<CredentialRecord>,
}

impl PortalSnapshot {
    pub fn new(store: StoreDump, credentials: Vec<CredentialRecord>) -> Self {
        Self {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            store,
            credentials,
        }
    }

    /// Validate the snapshot before import
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Export schema version {} is newer than supported version {}. \
                 Please update the server.",
                self.schema_version, EXPORT_SCHEMA_VERSION
            ));
        }

        let mut sources = HashSet::new();
        for candidate in &self.store.voting {
            if !sources.insert(candidate.source_submission_id.as_str()) {
                return Err(format!(
                    "Submission '{}' is enrolled more than once",
                    candidate.source_submission_id
                ));
            }
        }

        let mut uids = HashSet::new();
        for account in self.store.users.iter().chain(self.store.teams.iter()) {
            if !uids.insert(account.uid.as_str()) {
                return Err(format!("Account uid '{}' appears twice", account.uid));
            }
        }
        for account in &self.store.users {
            if account.role == Role::Team {
                return Err(format!("Team account '{}' stored with members", account.uid));
            }
        }
        for account in &self.store.teams {
            if account.role != Role::Team {
                return Err(format!("Member account '{}' stored with teams", account.uid));
            }
        }

        for record in &self.credentials {
            if !uids.contains(record.uid.as_str()) {
                return Err(format!(
                    "Credentials for '{}' have no matching account",
                    record.email
                ));
            }
        }

        Ok(())
    }
}

impl AppState {
    pub async fn export_state(&self) -> PortalResult<PortalSnapshot> {
        let store = self.store.dump().await?;
        let credentials = self.identity.records().await;
        Ok(PortalSnapshot::new(store, credentials))
    }

    /// Replace store and credentials with the snapshot. Sessions whose
    /// account no longer exists are dropped.
    pub async fn import_state(&self, snapshot: PortalSnapshot) -> PortalResult<()> {
        snapshot.validate().map_err(PortalError::Validation)?;

        let known: HashSet<Uid> = snapshot
            .store
            .users
            .iter()
            .chain(snapshot.store.teams.iter())
            .map(|a| a.uid.clone())
            .collect();
        let settings = snapshot.store.settings;

        self.store.load(snapshot.store).await?;
        self.identity.restore(snapshot.credentials).await;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| known.contains(&s.uid));
        let dropped = before - sessions.len();
        drop(sessions);

        tracing::info!(
            "Imported snapshot, {} sessions dropped, phase {:?}",
            dropped,
            settings.phase()
        );

        self.broadcast_to_all(ServerMessage::Phase {
            phase: settings.phase(),
            settings,
        });
        Ok(())
    }
}

/// Where and how often snapshots are written
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Snapshot file (None = keep everything in memory only)
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_interval: Duration,
}

impl StoreConfig {
    pub const DEFAULT_INTERVAL_SECS: u64 = 30;

    /// Load from SNAPSHOT_PATH and SNAPSHOT_INTERVAL_SECS
    pub fn from_env() -> Self {
        let snapshot_path = std::env::var("SNAPSHOT_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let interval_secs = match std::env::var("SNAPSHOT_INTERVAL_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(
                        "Invalid SNAPSHOT_INTERVAL_SECS '{}', using {}",
                        raw,
                        Self::DEFAULT_INTERVAL_SECS
                    );
                    Self::DEFAULT_INTERVAL_SECS
                }
            },
            Err(_) => Self::DEFAULT_INTERVAL_SECS,
        };

        match &snapshot_path {
            Some(path) => tracing::info!(
                "Snapshots go to {} every {}s",
                path.display(),
                interval_secs
            ),
            None => tracing::warn!("SNAPSHOT_PATH not set - state is lost on restart!"),
        }

        Self {
            snapshot_path,
            snapshot_interval: Duration::from_secs(interval_secs),
        }
    }
}

/// Errors from reading or writing snapshot files
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Portal(#[from] PortalError),
}

/// Write the current state to `path`, replacing the file atomically
pub async fn save_snapshot(state: &AppState, path: &Path) -> Result<(), SnapshotError> {
    let snapshot = state.export_state().await?;
    let json = serde_json::to_vec_pretty(&snapshot)?;

    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;

    tracing::debug!("Snapshot written to {}", path.display());
    Ok(())
}

/// Restore state from `path`. Returns false if there is no file yet.
pub async fn load_snapshot(state: &AppState, path: &Path) -> Result<bool, SnapshotError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let snapshot: PortalSnapshot = serde_json::from_slice(&bytes)?;
    state.import_state(snapshot).await?;

    tracing::info!("Restored state from {}", path.display());
    Ok(true)
}
