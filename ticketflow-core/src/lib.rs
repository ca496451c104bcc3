//! # ticketflow-core
//!
//! Core library for ticketflow - Jira ticket analytics for an operations
//! backlog.
//!
//! This library provides:
//! - Batched Jira search with changelog expansion
//! - Changelog parsing into status, priority level and label transitions
//! - Priority flow classification (tickets entering and leaving the active backlog)
//! - Time series over daily, weekly and monthly buckets
//! - A JSON snapshot cache with merge-on-save
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three layers:
//! - **Raw:** Jira search pages ([`types::RawIssue`])
//! - **Enriched:** One [`EnrichedTicket`] per issue, persisted as a [`Snapshot`]
//! - **Derived:** Dashboard series, recomputed from tickets on demand
//!
//! ## Example
//!
//! ```rust,no_run
//! use ticketflow_core::{Config, DashboardService, Dataset};
//!
//! # async fn run() -> ticketflow_core::Result<()> {
//! let config = Config::load()?;
//! let service = DashboardService::from_config(config)?;
//! let (report, dashboard) = service.dashboard(Dataset::Current, chrono::Utc::now()).await?;
//! println!("{} tickets from {:?}", dashboard.counts.total, report.source);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{build_dashboard, Dashboard, Interval};
pub use config::Config;
pub use error::{Error, Result};
pub use service::{DashboardService, DataSource, Dataset, RefreshReport};
pub use snapshot::{SaveOutcome, SaveReason, SnapshotStore};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod logging;
pub mod service;
pub mod snapshot;
pub mod types;
