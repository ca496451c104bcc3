//! Batched issue fetching
//!
//! [`BatchFetcher`] pages through a search query one request at a time.
//! The server total is only known after the first page and every offset
//! depends on the previous one, so pages are requested strictly in
//! sequence.
//!
//! ## Stopping rules
//!
//! The loop ends as soon as any of these hold:
//! - collected issues reached `max_results`
//! - `max_pages` requests were made
//! - the next offset is at or past the server total (re-read every page,
//!   so a shrinking total ends the loop early)
//! - a page came back with no issues at all, even if the total says more
//!   remain (a page whose issues were all malformed does not count as empty)
//!
//! Any failed page aborts the whole batch; no partial result is returned.
//! A malformed issue inside a page only drops that issue.

mod client;

pub use client::JiraClient;

use async_trait::async_trait;

use crate::config::JiraConfig;
use crate::error::Result;
use crate::types::{RawIssue, SearchPage};

/// Field projection requested for every issue
pub fn default_fields(priority_level_id: &str) -> Vec<String> {
    [
        "summary",
        "status",
        "labels",
        "created",
        "updated",
        "issuetype",
        "assignee",
        "reporter",
        priority_level_id,
    ]
    .iter()
    .map(|f| f.to_string())
    .collect()
}

/// One search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub jql: String,
    pub fields: Vec<String>,
    pub start_at: usize,
    pub max_results: usize,
    pub expand_changelog: bool,
}

/// Anything that can answer a single page of a search query
#[async_trait]
pub trait IssuePageSource: Send + Sync {
    async fn fetch_page(&self, request: &SearchRequest) -> Result<SearchPage>;
}

/// Query and limits for one batch
#[derive(Debug, Clone)]
pub struct BatchQuery {
    pub jql: String,
    pub fields: Vec<String>,
    pub expand_changelog: bool,
    pub page_size: usize,
    pub max_results: usize,
    pub max_pages: usize,
}

impl BatchQuery {
    /// Build a query using the limits from configuration
    pub fn from_config(jql: &str, fields: Vec<String>, config: &JiraConfig) -> Self {
        Self {
            jql: jql.to_string(),
            fields,
            expand_changelog: true,
            page_size: config.page_size,
            max_results: config.max_results,
            max_pages: config.max_pages,
        }
    }
}

/// Result of a complete batch
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub issues: Vec<RawIssue>,
    /// Total reported by the last page received
    pub total: usize,
    /// Number of requests made
    pub pages: usize,
    /// Issues received but dropped as malformed
    pub skipped: usize,
    /// True if fewer issues were received than the server reported
    pub truncated: bool,
}

/// Sequential paginator over an [`IssuePageSource`]
pub struct BatchFetcher<S> {
    source: S,
}

impl<S: IssuePageSource> BatchFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Access the underlying page source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch every page of `query` within its limits.
    pub async fn fetch_all(&self, query: &BatchQuery) -> Result<BatchResult> {
        let page_size = query.page_size.max(1);
        let mut issues: Vec<RawIssue> = Vec::new();
        let mut total = 0;
        let mut pages = 0;
        let mut skipped = 0;
        let mut start_at = 0;

        loop {
            let request = SearchRequest {
                jql: query.jql.clone(),
                fields: query.fields.clone(),
                start_at,
                max_results: page_size,
                expand_changelog: query.expand_changelog,
            };

            let page = self.source.fetch_page(&request).await?;
            pages += 1;
            total = page.total;
            let received = page.issues.len() + page.skipped;
            skipped += page.skipped;
            issues.extend(page.issues);
            start_at += page_size;

            tracing::debug!(
                page = pages,
                received,
                collected = issues.len(),
                total,
                "Fetched search page"
            );

            if received == 0
                || issues.len() >= query.max_results
                || pages >= query.max_pages
                || start_at >= total
            {
                break;
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "Dropped malformed issues from batch");
        }

        let truncated = issues.len() + skipped < total;
        if truncated {
            tracing::warn!(
                fetched = issues.len(),
                total,
                pages,
                "Batch stopped before reaching the server total"
            );
        }

        Ok(BatchResult {
            issues,
            total,
            pages,
            skipped,
            truncated,
        })
    }
}
