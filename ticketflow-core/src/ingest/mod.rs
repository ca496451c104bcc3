//! Ingestion layer: raw Jira issues → enriched tickets
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────────┐     ┌────────────────┐
//! │  RawIssue   │ ──► │     enrich_issue     │ ──► │ EnrichedTicket │
//! │ (+changelog)│     │                      │     │                │
//! └─────────────┘     └──────────────────────┘     └────────────────┘
//!                        │              │
//!                        ▼              ▼
//!          ┌─────────────────────┐  ┌───────────────┐
//!          │ extract_transitions │  │ classify_flow │
//!          └─────────────────────┘  └───────────────┘
//! ```
//!
//! Everything here is pure: the current time is a parameter, nothing is
//! read from the clock, and no I/O happens.

pub mod flow;
pub mod transitions;

pub use flow::{classify_flow, ACTIVE_BACKLOG_MAX};
pub use transitions::extract_transitions;

use chrono::{DateTime, Utc};

use crate::config::FieldsConfig;
use crate::types::{
    CurrentValue, EnrichedTicket, PriorityCategory, RawIssue, UNKNOWN_AUTHOR,
};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Whole days between two instants, rounded up.
///
/// The absolute difference is used so clock skew between Jira and the
/// local machine never yields a negative age.
pub fn ceil_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let seconds = (to - from).num_seconds().unsigned_abs() as f64;
    (seconds / SECONDS_PER_DAY).ceil() as i64
}

/// Turn one raw issue into an enriched ticket as of `now`.
pub fn enrich_issue(issue: &RawIssue, fields: &FieldsConfig, now: DateTime<Utc>) -> EnrichedTicket {
    let f = &issue.fields;

    let created = f.created.unwrap_or_else(|| {
        tracing::warn!(key = %issue.key, "Issue has no creation timestamp, using now");
        now
    });
    let creator = f
        .reporter
        .as_ref()
        .map(|r| r.label())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    let history = extract_transitions(issue.changelog.as_ref(), fields);
    let priority_level = f.custom_integer(&fields.priority_level_id);
    let flow = classify_flow(&history.priority_level, priority_level, created);

    let status = f.status.as_ref().map(|s| s.name.clone());
    let labels = f.labels.clone();
    let source_labels = labels
        .iter()
        .filter(|l| fields.is_source_label(l))
        .cloned()
        .collect();

    let current_status = match history.status.last() {
        Some(t) => CurrentValue {
            value: status.clone(),
            changed_at: t.timestamp,
            changed_by: t.author.clone(),
        },
        None => CurrentValue {
            value: status.clone(),
            changed_at: created,
            changed_by: creator.clone(),
        },
    };
    let current_priority_level = match history.priority_level.last() {
        Some(t) => CurrentValue {
            value: priority_level,
            changed_at: t.timestamp,
            changed_by: t.author.clone(),
        },
        None => CurrentValue {
            value: priority_level,
            changed_at: created,
            changed_by: creator.clone(),
        },
    };
    let current_labels = match history.labels.last() {
        Some(t) => CurrentValue {
            value: labels.clone(),
            changed_at: t.timestamp,
            changed_by: t.author.clone(),
        },
        None => CurrentValue {
            value: labels.clone(),
            changed_at: created,
            changed_by: creator,
        },
    };

    let mut ticket = EnrichedTicket {
        key: issue.key.clone(),
        summary: f.summary.clone(),
        issue_type: f.issuetype.as_ref().map(|t| t.name.clone()),
        assignee: f.assignee.as_ref().map(|a| a.label()),
        status,
        status_id: f.status.as_ref().and_then(|s| s.id.clone()),
        labels,
        source_labels,
        priority_level,
        priority_category: PriorityCategory::from_level(priority_level),
        created,
        updated: f.updated,
        age_in_days: 0,
        days_since_incoming: None,
        days_since_outgoing: None,
        flow,
        status_transitions: history.status,
        priority_level_transitions: history.priority_level,
        label_transitions: history.labels,
        current_status,
        current_priority_level,
        current_labels,
        historical: false,
        last_seen: None,
    };
    refresh_ages(&mut ticket, now);
    ticket
}

/// Recompute the fields that depend on the current time.
///
/// Cached tickets keep the ages of their fetch; call this before reporting
/// on them at a later `now`.
pub fn refresh_ages(ticket: &mut EnrichedTicket, now: DateTime<Utc>) {
    ticket.age_in_days = ceil_days(ticket.created, now);
    ticket.days_since_incoming = ticket.flow.incoming_date.map(|d| ceil_days(d, now));
    ticket.days_since_outgoing = ticket.flow.outgoing_date.map(|d| ceil_days(d, now));
}

/// Enrich a batch of issues, preserving order.
pub fn enrich_issues(
    issues: &[RawIssue],
    fields: &FieldsConfig,
    now: DateTime<Utc>,
) -> Vec<EnrichedTicket> {
    let tickets: Vec<_> = issues
        .iter()
        .map(|issue| enrich_issue(issue, fields, now))
        .collect();

    tracing::debug!(count = tickets.len(), "Enriched issues");
    tickets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(json: serde_json::Value) -> RawIssue {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_ceil_days() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(ceil_days(a, a), 0);
        assert_eq!(ceil_days(a, a + chrono::Duration::hours(1)), 1);
        assert_eq!(ceil_days(a, a + chrono::Duration::days(19)), 19);
        // Clock skew: future creation still yields a positive age
        assert_eq!(ceil_days(a + chrono::Duration::hours(30), a), 2);
    }

    #[test]
    fn test_enrich_incoming_ticket() {
        let issue = raw(serde_json::json!({
            "key": "OPS-1",
            "fields": {
                "created": "2024-01-01T00:00:00.000+0000",
                "summary": "Login fails",
                "status": { "id": "3", "name": "In Progress" },
                "labels": ["src-bug-fix", "backend"],
                "reporter": { "displayName": "Rita" },
                "customfield_11129": 5
            },
            "changelog": { "histories": [{
                "created": "2024-01-05T00:00:00.000+0000",
                "author": { "displayName": "Ada" },
                "items": [{ "field": "customfield_11129", "fromString": null, "toString": "5" }]
            }]}
        }));
        let now = Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap();

        let ticket = enrich_issue(&issue, &FieldsConfig::default(), now);

        assert_eq!(ticket.priority_category, PriorityCategory::High);
        assert_eq!(ticket.age_in_days, 19);
        assert_eq!(
            ticket.flow.incoming_date,
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(ticket.days_since_incoming, Some(15));
        assert_eq!(ticket.days_since_outgoing, None);
        assert_eq!(ticket.source_labels, vec!["src-bug-fix"]);
        assert_eq!(ticket.status_id.as_deref(), Some("3"));
        assert_eq!(ticket.current_priority_level.value, Some(5));
        assert_eq!(ticket.current_priority_level.changed_by, "Ada");
        // No status history: creation metadata
        assert_eq!(ticket.current_status.changed_by, "Rita");
        assert_eq!(ticket.current_status.changed_at, ticket.created);
        assert!(!ticket.historical);
    }

    #[test]
    fn test_refresh_ages_moves_with_now() {
        let issue = raw(serde_json::json!({
            "key": "OPS-6",
            "fields": { "created": "2024-01-01T00:00:00.000+0000", "customfield_11129": 500 }
        }));
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut ticket = enrich_issue(&issue, &FieldsConfig::default(), created);
        assert_eq!(ticket.age_in_days, 0);
        assert_eq!(ticket.days_since_outgoing, Some(0));

        refresh_ages(&mut ticket, Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap());

        assert_eq!(ticket.age_in_days, 30);
        assert_eq!(ticket.days_since_outgoing, Some(30));
        assert_eq!(ticket.days_since_incoming, None);
    }

    #[test]
    fn test_enrich_without_priority_level() {
        let issue = raw(serde_json::json!({
            "key": "OPS-2",
            "fields": { "created": "2024-01-01T00:00:00.000+0000", "labels": null }
        }));
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();

        let ticket = enrich_issue(&issue, &FieldsConfig::default(), now);

        assert_eq!(ticket.priority_category, PriorityCategory::Unknown);
        assert_eq!(ticket.age_in_days, 2);
        assert!(!ticket.flow.is_incoming);
        assert!(!ticket.flow.is_outgoing);
        assert!(ticket.labels.is_empty());
        assert_eq!(ticket.current_labels.changed_by, UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_enrich_string_priority_level_and_low_category() {
        let issue = raw(serde_json::json!({
            "key": "OPS-3",
            "fields": {
                "created": "2024-01-01T00:00:00.000+0000",
                "customfield_11129": "250"
            }
        }));
        let now = Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap();

        let ticket = enrich_issue(&issue, &FieldsConfig::default(), now);

        assert_eq!(ticket.priority_level, Some(250));
        assert_eq!(ticket.priority_category, PriorityCategory::Low);
        assert!(ticket.flow.is_outgoing);
        assert_eq!(ticket.flow.outgoing_date, Some(ticket.created));
        assert_eq!(ticket.days_since_outgoing, Some(10));
    }

    #[test]
    fn test_enrich_batch_survives_bad_values() {
        let issues = vec![
            raw(serde_json::json!({
                "key": "OPS-4",
                "fields": { "created": "not a date", "customfield_11129": {"value": "x"} },
                "changelog": { "histories": [{
                    "created": "2024-01-05T00:00:00.000+0000",
                    "items": [{ "field": "Priority Level", "fromString": "abc", "toString": "def" }]
                }]}
            })),
            raw(serde_json::json!({ "key": "OPS-5" })),
        ];
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let tickets = enrich_issues(&issues, &FieldsConfig::default(), now);

        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].priority_level, None);
        assert_eq!(tickets[0].created, now);
        assert_eq!(tickets[0].priority_level_transitions.len(), 1);
        assert_eq!(tickets[0].current_priority_level.changed_by, UNKNOWN_AUTHOR);
        assert_eq!(tickets[1].key, "OPS-5");
    }
}
