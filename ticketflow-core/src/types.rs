//! Core domain types for ticketflow
//!
//! Two families of types live here:
//!
//! - **Raw** types mirror the Jira search API payload (`/rest/api/2/search`
//!   with `expand=changelog`). They are lenient: optional fields default,
//!   unknown fields are kept in [`IssueFields::custom`].
//! - **Canonical** types ([`EnrichedTicket`], [`Snapshot`]) are what the
//!   pipeline produces, caches to disk and hands to the presentation layer.
//!   They serialize as camelCase JSON.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Priority Level** | Integer custom field; lower is more urgent |
//! | **Active backlog** | Tickets with a priority level below 100 |
//! | **Incoming** | Entry into the active backlog |
//! | **Outgoing** | Exit from the active backlog (cleared, or raised past 99) |
//! | **Source label** | A label with the configured prefix (default `src-`) |

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};

// ============================================
// Raw Jira payload
// ============================================

/// One page of `/rest/api/2/search`
///
/// Issues are decoded one at a time. An issue that does not fit
/// [`RawIssue`] is logged and counted in `skipped` instead of failing the
/// whole page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "WireSearchPage")]
pub struct SearchPage {
    pub start_at: usize,
    pub total: usize,
    pub issues: Vec<RawIssue>,
    /// Issues present on the page but dropped as malformed
    pub skipped: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSearchPage {
    #[serde(default)]
    start_at: usize,
    #[serde(default)]
    total: usize,
    /// Absent or null issue lists count as an empty page
    #[serde(default, deserialize_with = "lenient_vec")]
    issues: Vec<serde_json::Value>,
}

impl From<WireSearchPage> for SearchPage {
    fn from(wire: WireSearchPage) -> Self {
        let received = wire.issues.len();
        let issues: Vec<RawIssue> = wire
            .issues
            .into_iter()
            .filter_map(|value| {
                let key = value
                    .get("key")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("<no key>")
                    .to_string();
                match serde_json::from_value::<RawIssue>(value) {
                    Ok(issue) => Some(issue),
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Skipping malformed issue");
                        None
                    }
                }
            })
            .collect();

        SearchPage {
            start_at: wire.start_at,
            total: wire.total,
            skipped: received - issues.len(),
            issues,
        }
    }
}

/// An issue as returned by the search API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIssue {
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
    #[serde(default, deserialize_with = "lenient_option")]
    pub changelog: Option<Changelog>,
}

/// Current field values of an issue
///
/// Every known field degrades to empty when its shape is unexpected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default, with = "jira_time::option")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, with = "jira_time::option")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "named_ref")]
    pub status: Option<NamedRef>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub labels: Vec<String>,
    #[serde(default, deserialize_with = "named_ref")]
    pub issuetype: Option<NamedRef>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub assignee: Option<UserRef>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub reporter: Option<UserRef>,
    /// Everything else, including custom fields such as the priority level
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl IssueFields {
    /// Read a custom field as an integer.
    ///
    /// Jira reports number fields as JSON numbers, but string values are
    /// accepted too. Anything unparseable is `None`.
    pub fn custom_integer(&self, field_id: &str) -> Option<i64> {
        match self.custom.get(field_id)? {
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(float_to_integer)),
            serde_json::Value::String(s) => parse_integer(s),
            _ => None,
        }
    }
}

/// A `{ id, name }` reference (status, issue type)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// A user reference (assignee, changelog author)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl UserRef {
    /// Best available human-readable name
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.account_id.clone())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }
}

/// Author recorded when a changelog entry has none
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Expanded changelog of an issue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Changelog {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub histories: Vec<ChangelogEntry>,
}

/// One changelog history entry (a single edit, possibly touching many fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogEntry {
    #[serde(default, with = "jira_time::option")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub author: Option<UserRef>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub items: Vec<ChangeItem>,
}

/// A single field change inside a changelog entry
///
/// Display strings arrive as numbers for some field types; those are kept
/// as their decimal text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeItem {
    #[serde(default)]
    pub field: String,
    #[serde(default, deserialize_with = "display_string")]
    pub field_id: Option<String>,
    #[serde(default, deserialize_with = "display_string")]
    pub from_string: Option<String>,
    #[serde(default, deserialize_with = "display_string")]
    pub to_string: Option<String>,
}

// ============================================
// Transitions
// ============================================

/// A change of one scalar field at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition<T> {
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub from_value: Option<T>,
    pub to_value: Option<T>,
}

/// Status change (display names)
pub type StatusTransition = Transition<String>;

/// Priority level change (parsed integers)
pub type PriorityLevelTransition = Transition<i64>;

/// Label set change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelTransition {
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub from_value: BTreeSet<String>,
    pub to_value: BTreeSet<String>,
    /// Labels in `to_value` but not in `from_value`
    pub added: BTreeSet<String>,
    /// Labels in `from_value` but not in `to_value`
    pub removed: BTreeSet<String>,
}

/// The three transition histories of one issue, each sorted by timestamp
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionHistory {
    pub status: Vec<StatusTransition>,
    pub priority_level: Vec<PriorityLevelTransition>,
    pub labels: Vec<LabelTransition>,
}

// ============================================
// Enriched tickets
// ============================================

/// Priority bucket derived from the priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityCategory {
    High,
    Medium,
    Low,
    Unknown,
}

impl PriorityCategory {
    /// `< 10` high, `< 100` medium, otherwise low; absent is unknown
    pub fn from_level(level: Option<i64>) -> Self {
        match level {
            Some(l) if l < 10 => PriorityCategory::High,
            Some(l) if l < 100 => PriorityCategory::Medium,
            Some(_) => PriorityCategory::Low,
            None => PriorityCategory::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityCategory::High => "high",
            PriorityCategory::Medium => "medium",
            PriorityCategory::Low => "low",
            PriorityCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PriorityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry into and exit from the active backlog.
///
/// Constructed only through [`PriorityFlowFlags::new`], which keeps each
/// boolean in step with its date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityFlowFlags {
    pub incoming_date: Option<DateTime<Utc>>,
    pub outgoing_date: Option<DateTime<Utc>>,
    pub is_incoming: bool,
    pub is_outgoing: bool,
}

impl PriorityFlowFlags {
    pub fn new(incoming_date: Option<DateTime<Utc>>, outgoing_date: Option<DateTime<Utc>>) -> Self {
        Self {
            incoming_date,
            outgoing_date,
            is_incoming: incoming_date.is_some(),
            is_outgoing: outgoing_date.is_some(),
        }
    }
}

/// A field's current value with who changed it last and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentValue<T> {
    pub value: T,
    pub changed_at: DateTime<Utc>,
    pub changed_by: String,
}

/// A ticket with every derived metric the dashboard needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTicket {
    pub key: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_id: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub source_labels: Vec<String>,
    pub priority_level: Option<i64>,
    pub priority_category: PriorityCategory,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    pub age_in_days: i64,
    #[serde(default)]
    pub days_since_incoming: Option<i64>,
    #[serde(default)]
    pub days_since_outgoing: Option<i64>,
    #[serde(flatten)]
    pub flow: PriorityFlowFlags,
    #[serde(default)]
    pub status_transitions: Vec<StatusTransition>,
    #[serde(default)]
    pub priority_level_transitions: Vec<PriorityLevelTransition>,
    #[serde(default)]
    pub label_transitions: Vec<LabelTransition>,
    pub current_status: CurrentValue<Option<String>>,
    pub current_priority_level: CurrentValue<Option<i64>>,
    pub current_labels: CurrentValue<Vec<String>>,
    /// Kept from an older snapshot after dropping out of the query
    #[serde(default)]
    pub historical: bool,
    /// Fetch time of the snapshot a historical ticket was last seen in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

// ============================================
// Snapshots
// ============================================

/// A persisted, timestamped set of enriched tickets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub jql_used: String,
    /// Total reported by Jira for the query at fetch time
    #[serde(default)]
    pub server_total: usize,
    #[serde(default)]
    pub truncated: bool,
    pub tickets: Vec<EnrichedTicket>,
}

impl Snapshot {
    /// First ticket key that appears more than once, if any
    pub fn duplicate_key(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::new();
        self.tickets
            .iter()
            .map(|t| t.key.as_str())
            .find(|key| !seen.insert(*key))
    }
}

// ============================================
// Parsing helpers
// ============================================

/// Parse a display string as an integer (`"5"`, `" 12 "`, `"5.0"`).
pub fn parse_integer(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().and_then(float_to_integer))
}

fn float_to_integer(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Decode a list element by element, dropping elements of the wrong shape.
/// Null or a non-list value is an empty list.
fn lenient_vec<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Null => return Ok(Vec::new()),
        other => {
            tracing::debug!(value = %other, "Expected a list, ignoring");
            return Ok(Vec::new());
        }
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(error = %e, "Dropping malformed list element");
                None
            }
        })
        .collect())
}

/// Decode an optional value, treating a wrong shape as absent
fn lenient_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value)
        .map_err(|e| tracing::debug!(error = %e, "Ignoring malformed field"))
        .ok())
}

/// `{ id, name }` object, or a bare name string
fn named_ref<'de, D>(deserializer: D) -> std::result::Result<Option<NamedRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(name) => Some(NamedRef { id: None, name }),
        value @ serde_json::Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// A string, or a number or boolean rendered as text
fn display_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Jira timestamps (`2024-01-05T10:00:00.000+0000`), with RFC 3339 accepted too.
pub mod jira_time {
    use chrono::{DateTime, Utc};

    /// Parse a Jira or RFC 3339 timestamp
    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z"))
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        /// Unparseable or non-string timestamps become `None`
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = serde_json::Value::deserialize(deserializer)?;
            Ok(raw.as_str().and_then(super::parse))
        }
    }
}
