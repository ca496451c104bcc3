//! Refresh-with-fallback orchestration
//!
//! Ties the pipeline together for one dataset:
//!
//! ```text
//! BatchFetcher ──► enrich_issues ──► Snapshot ──► SnapshotStore::save_if_newer
//!      │ (error or no credentials)
//!      ▼
//! SnapshotStore::load ──► cached Snapshot, or Error::NoData
//! ```
//!
//! Upstream failures are not retried. When they happen the most recent
//! cached snapshot is served instead, with the failure attached as a
//! warning.

use chrono::{DateTime, Utc};

use crate::analytics::{build_dashboard, Dashboard};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{default_fields, BatchFetcher, BatchQuery, IssuePageSource, JiraClient};
use crate::ingest::enrich_issues;
use crate::snapshot::{SaveOutcome, SnapshotStore};
use crate::types::Snapshot;

/// Remediation hint attached to [`Error::NoData`]
pub const NO_DATA_HINT: &str =
    "provide Jira credentials in config.toml or fetch once to populate the cache";

/// A logical ticket set with its own query and cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Current,
    Historical,
}

impl Dataset {
    pub fn cache_key(&self) -> &'static str {
        match self {
            Dataset::Current => "current-tickets",
            Dataset::Historical => "historical-tickets",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Current => "current",
            Dataset::Historical => "historical",
        }
    }

    /// Query for this dataset, if configured
    pub fn jql<'a>(&self, config: &'a Config) -> Option<&'a str> {
        match self {
            Dataset::Current => Some(config.jira.jql.as_str()),
            Dataset::Historical => config.jira.historical_jql.as_deref(),
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the returned snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Cache,
}

/// Result of [`DashboardService::refresh`]
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub dataset: Dataset,
    pub source: DataSource,
    pub snapshot: Snapshot,
    /// Save outcome for live fetches that reached the store
    pub save: Option<SaveOutcome>,
    /// Search requests made (0 when served from cache)
    pub pages: usize,
    /// Why the cache was used, or why the save failed
    pub warning: Option<String>,
}

/// Fetches, enriches and caches ticket sets
pub struct DashboardService<S> {
    config: Config,
    store: SnapshotStore,
    fetcher: Option<BatchFetcher<S>>,
}

impl DashboardService<JiraClient> {
    /// Service backed by the Jira client when credentials are configured,
    /// cache-only otherwise.
    pub fn from_config(config: Config) -> Result<Self> {
        let store = SnapshotStore::from_config(&config.cache);
        let client = if config.jira.is_ready() {
            Some(JiraClient::new(&config.jira)?)
        } else {
            tracing::info!("Jira not configured, serving cached data only");
            None
        };
        Ok(Self::new(config, store, client))
    }
}

impl<S: IssuePageSource> DashboardService<S> {
    pub fn new(config: Config, store: SnapshotStore, source: Option<S>) -> Self {
        Self {
            config,
            store,
            fetcher: source.map(BatchFetcher::new),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch `dataset` from Jira and cache it, falling back to the cache.
    pub async fn refresh(&self, dataset: Dataset, now: DateTime<Utc>) -> Result<RefreshReport> {
        let failure = match (self.fetcher.as_ref(), dataset.jql(&self.config)) {
            (Some(fetcher), Some(jql)) => match self.fetch_live(fetcher, dataset, jql, now).await {
                Ok(report) => return Ok(report),
                Err(e) => {
                    tracing::warn!(dataset = %dataset, error = %e, "Live fetch failed, falling back to cache");
                    e.to_string()
                }
            },
            (None, _) => "Jira credentials not configured".to_string(),
            (Some(_), None) => format!("no query configured for {} tickets", dataset),
        };

        match self.store.load(dataset.cache_key()).await {
            Some(snapshot) => {
                tracing::info!(
                    dataset = %dataset,
                    fetched_at = %snapshot.fetched_at,
                    tickets = snapshot.tickets.len(),
                    "Serving cached snapshot"
                );
                Ok(RefreshReport {
                    dataset,
                    source: DataSource::Cache,
                    snapshot,
                    save: None,
                    pages: 0,
                    warning: Some(failure),
                })
            }
            None => Err(Error::NoData {
                dataset: dataset.to_string(),
                hint: format!("{} ({})", NO_DATA_HINT, failure),
            }),
        }
    }

    async fn fetch_live(
        &self,
        fetcher: &BatchFetcher<S>,
        dataset: Dataset,
        jql: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshReport> {
        let fields = &self.config.fields;
        let query = BatchQuery::from_config(
            jql,
            default_fields(&fields.priority_level_id),
            &self.config.jira,
        );

        tracing::info!(dataset = %dataset, jql, "Fetching tickets");
        let batch = fetcher.fetch_all(&query).await?;
        tracing::info!(
            dataset = %dataset,
            fetched = batch.issues.len(),
            total = batch.total,
            pages = batch.pages,
            skipped = batch.skipped,
            "Fetched tickets"
        );

        let candidate = Snapshot {
            fetched_at: now,
            jql_used: jql.to_string(),
            server_total: batch.total,
            truncated: batch.truncated,
            tickets: enrich_issues(&batch.issues, fields, now),
        };

        let key = dataset.cache_key();
        let (save, warning) = match self.store.save_if_newer(key, candidate.clone()).await {
            Ok(outcome) => (
                Some(outcome),
                (batch.skipped > 0)
                    .then(|| format!("skipped {} malformed issues", batch.skipped)),
            ),
            Err(e) => {
                tracing::warn!(dataset = %dataset, error = %e, "Failed to cache snapshot");
                (None, Some(format!("failed to cache snapshot: {}", e)))
            }
        };

        // What is on disk now: the merged result, or a newer snapshot that won
        let snapshot = match save {
            Some(_) => self.store.load(key).await.unwrap_or(candidate),
            None => candidate,
        };

        Ok(RefreshReport {
            dataset,
            source: DataSource::Live,
            snapshot,
            save,
            pages: batch.pages,
            warning,
        })
    }

    /// Refresh the current and (if configured) historical datasets concurrently.
    pub async fn refresh_all(
        &self,
        now: DateTime<Utc>,
    ) -> (Result<RefreshReport>, Option<Result<RefreshReport>>) {
        if self.config.jira.historical_jql.is_none() {
            return (self.refresh(Dataset::Current, now).await, None);
        }

        let (current, historical) = tokio::join!(
            self.refresh(Dataset::Current, now),
            self.refresh(Dataset::Historical, now)
        );
        (current, Some(historical))
    }

    /// Refresh `dataset` and build its dashboard.
    pub async fn dashboard(
        &self,
        dataset: Dataset,
        now: DateTime<Utc>,
    ) -> Result<(RefreshReport, Dashboard)> {
        let report = self.refresh(dataset, now).await?;
        let dashboard = build_dashboard(report.snapshot.tickets.clone(), now);
        Ok((report, dashboard))
    }

    /// Dashboard from the cache only, without contacting Jira.
    pub async fn cached_dashboard(&self, dataset: Dataset, now: DateTime<Utc>) -> Result<Dashboard> {
        let snapshot = self
            .store
            .load(dataset.cache_key())
            .await
            .ok_or_else(|| Error::NoData {
                dataset: dataset.to_string(),
                hint: NO_DATA_HINT.to_string(),
            })?;
        Ok(build_dashboard(snapshot.tickets, now))
    }
}
