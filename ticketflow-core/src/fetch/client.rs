//! HTTP client for the Jira search API
//!
//! Issues `GET /rest/api/2/search` with basic auth. Each request carries
//! the configured timeout; failures are not retried here, the caller
//! decides whether to fall back to cached data.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};

use crate::config::JiraConfig;
use crate::error::{Error, Result};
use crate::types::SearchPage;

use super::{IssuePageSource, SearchRequest};

/// HTTP client for Jira
pub struct JiraClient {
    http_client: reqwest::Client,
    base_url: String,
    email: String,
    api_token: String,
}

impl JiraClient {
    /// Create a new client from configuration
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: &JiraConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| Error::Config("jira.base_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let email = config
            .email
            .clone()
            .ok_or_else(|| Error::Config("jira.email is required".to_string()))?;
        let api_token = config
            .resolved_api_token()
            .ok_or_else(|| Error::Config("jira.api_token is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            email,
            api_token,
        })
    }

    /// Search endpoint URL
    fn search_url(&self) -> String {
        format!("{}/rest/api/2/search", self.base_url)
    }
}

#[async_trait]
impl IssuePageSource for JiraClient {
    async fn fetch_page(&self, request: &SearchRequest) -> Result<SearchPage> {
        let mut query: Vec<(&str, String)> = vec![
            ("jql", request.jql.clone()),
            ("startAt", request.start_at.to_string()),
            ("maxResults", request.max_results.to_string()),
        ];
        if !request.fields.is_empty() {
            query.push(("fields", request.fields.join(",")));
        }
        if request.expand_changelog {
            query.push(("expand", "changelog".to_string()));
        }

        let response = self
            .http_client
            .get(self.search_url())
            .basic_auth(&self.email, Some(&self.api_token))
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            response
                .json::<SearchPage>()
                .await
                .map_err(|e| Error::Request(format!("failed to parse response: {}", e)))
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Http {
                status: status.as_u16(),
                body,
            })
        }
    }
}
