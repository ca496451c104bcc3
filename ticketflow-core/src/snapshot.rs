//! Snapshot persistence
//!
//! One pretty-printed JSON document per cache key, stored as
//! `<cache dir>/<key>.json`.
//!
//! The cache is advisory: a missing, unreadable or invalid file loads as
//! `None` and is never reported as an error. Writes only land when the
//! candidate is strictly newer than what is on disk, and tickets that
//! dropped out of the newer result are carried over as historical.
//!
//! Access to a key is not locked. Two writers racing between the read and
//! the write of [`SnapshotStore::save_if_newer`] can lose an update.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::types::Snapshot;

/// Why a save did or did not happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveReason {
    /// Nothing cached yet; the candidate was written as-is
    NoExistingData,
    /// Candidate merged with the older cached snapshot
    Merged,
    /// Cached snapshot is as new as or newer than the candidate
    ExistingDataNewer,
}

impl SaveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveReason::NoExistingData => "no_existing_data",
            SaveReason::Merged => "merged",
            SaveReason::ExistingDataNewer => "existing_data_newer",
        }
    }
}

/// Ticket counts of a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeInfo {
    /// Tickets in the candidate snapshot
    pub new_tickets: usize,
    /// Tickets in the previously cached snapshot
    pub existing_tickets: usize,
    /// Old tickets carried over as historical
    pub historical_tickets: usize,
    /// Tickets in the merged result
    pub total_merged: usize,
}

/// Outcome of [`SnapshotStore::save_if_newer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub saved: bool,
    pub reason: SaveReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_info: Option<MergeInfo>,
}

/// Merge `new` over `old`, keyed by ticket key.
///
/// Every ticket of `new` is kept (first occurrence wins on duplicate
/// keys). Tickets only present in `old` are appended with `historical`
/// set; `last_seen` is the old snapshot's fetch time unless the ticket was
/// already historical, in which case its earlier `last_seen` is kept.
pub fn merge_snapshots(old: &Snapshot, new: Snapshot) -> (Snapshot, MergeInfo) {
    let new_count = new.tickets.len();
    let mut merged = dedupe(new);
    let mut seen: HashSet<String> = merged.tickets.iter().map(|t| t.key.clone()).collect();

    let mut historical_tickets = 0;
    for ticket in &old.tickets {
        if !seen.insert(ticket.key.clone()) {
            continue;
        }
        let mut carried = ticket.clone();
        if !(carried.historical && carried.last_seen.is_some()) {
            carried.last_seen = Some(old.fetched_at);
        }
        carried.historical = true;
        merged.tickets.push(carried);
        historical_tickets += 1;
    }

    let info = MergeInfo {
        new_tickets: new_count,
        existing_tickets: old.tickets.len(),
        historical_tickets,
        total_merged: merged.tickets.len(),
    };
    (merged, info)
}

/// Drop repeated ticket keys, keeping the first occurrence
fn dedupe(mut snapshot: Snapshot) -> Snapshot {
    let mut seen = HashSet::new();
    let before = snapshot.tickets.len();
    snapshot.tickets.retain(|t| seen.insert(t.key.clone()));
    if snapshot.tickets.len() != before {
        tracing::warn!(
            dropped = before - snapshot.tickets.len(),
            "Dropped duplicate ticket keys from snapshot"
        );
    }
    snapshot
}

/// JSON-file snapshot cache
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Store rooted at `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the configured cache directory
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.resolved_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`; characters outside `[A-Za-z0-9_-]` become `_`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file))
    }

    /// Load the snapshot for `key`, or `None` if absent or invalid.
    pub async fn load(&self, key: &str) -> Option<Snapshot> {
        let path = self.path_for(key);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(key, "No cached snapshot");
                return None;
            }
            Err(e) => {
                tracing::warn!(key, path = %path.display(), error = %e, "Failed to read snapshot");
                return None;
            }
        };

        let snapshot: Snapshot = match serde_json::from_str(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(key, path = %path.display(), error = %e, "Ignoring malformed snapshot");
                return None;
            }
        };

        if let Some(duplicate) = snapshot.duplicate_key() {
            tracing::warn!(key, duplicate, "Ignoring snapshot with duplicate ticket keys");
            return None;
        }

        Some(snapshot)
    }

    /// Persist `candidate` unless the cached snapshot is as new or newer.
    pub async fn save_if_newer(&self, key: &str, candidate: Snapshot) -> Result<SaveOutcome> {
        let Some(existing) = self.load(key).await else {
            self.write(key, &dedupe(candidate)).await?;
            tracing::info!(key, "Saved snapshot (no previous data)");
            return Ok(SaveOutcome {
                saved: true,
                reason: SaveReason::NoExistingData,
                merged_info: None,
            });
        };

        if candidate.fetched_at <= existing.fetched_at {
            tracing::info!(
                key,
                existing = %existing.fetched_at,
                candidate = %candidate.fetched_at,
                "Skipped save, cached snapshot is newer"
            );
            return Ok(SaveOutcome {
                saved: false,
                reason: SaveReason::ExistingDataNewer,
                merged_info: None,
            });
        }

        let (merged, info) = merge_snapshots(&existing, candidate);
        self.write(key, &merged).await?;

        tracing::info!(
            key,
            new_tickets = info.new_tickets,
            existing_tickets = info.existing_tickets,
            historical = info.historical_tickets,
            total = info.total_merged,
            "Saved merged snapshot"
        );

        Ok(SaveOutcome {
            saved: true,
            reason: SaveReason::Merged,
            merged_info: Some(info),
        })
    }

    /// Keys with a snapshot file in the cache directory, sorted
    pub fn keys(&self) -> Vec<String> {
        let pattern = self
            .dir
            .join("*.json")
            .to_string_lossy()
            .replace(['[', ']'], "?");

        let mut keys: Vec<String> = match glob::glob(&pattern) {
            Ok(paths) => paths
                .filter_map(|p| p.ok())
                .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid cache directory pattern");
                Vec::new()
            }
        };
        keys.sort();
        keys
    }

    /// Write via a temporary file so readers never see a partial document
    async fn write(&self, key: &str, snapshot: &Snapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(snapshot)?;

        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
