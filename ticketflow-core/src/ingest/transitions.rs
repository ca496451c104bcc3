//! Changelog → transition histories
//!
//! Walks every changelog entry and item once, routing status, priority
//! level and label changes into their own lists. Each list is then sorted
//! by timestamp with a stable sort, so entries sharing a timestamp keep
//! their changelog order.
//!
//! Malformed items never fail extraction: a non-numeric priority level
//! becomes `None`, entries without a timestamp are skipped.

use std::collections::BTreeSet;

use crate::config::FieldsConfig;
use crate::types::{
    parse_integer, Changelog, LabelTransition, PriorityLevelTransition, StatusTransition,
    TransitionHistory, UNKNOWN_AUTHOR,
};

/// Extract sorted status, priority level and label transitions.
///
/// A missing changelog yields three empty lists.
pub fn extract_transitions(
    changelog: Option<&Changelog>,
    fields: &FieldsConfig,
) -> TransitionHistory {
    let mut history = TransitionHistory::default();

    let Some(changelog) = changelog else {
        return history;
    };

    for entry in &changelog.histories {
        let Some(timestamp) = entry.created else {
            tracing::debug!("Skipping changelog entry without timestamp");
            continue;
        };
        let author = entry
            .author
            .as_ref()
            .map(|a| a.label())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        for item in &entry.items {
            if item.field.eq_ignore_ascii_case("status") {
                history.status.push(StatusTransition {
                    timestamp,
                    author: author.clone(),
                    from_value: non_empty(item.from_string.as_deref()),
                    to_value: non_empty(item.to_string.as_deref()),
                });
            } else if fields.matches_priority_level(item.field_id.as_deref(), &item.field) {
                history.priority_level.push(PriorityLevelTransition {
                    timestamp,
                    author: author.clone(),
                    from_value: parse_level(item.from_string.as_deref()),
                    to_value: parse_level(item.to_string.as_deref()),
                });
            } else if item.field.eq_ignore_ascii_case("labels") {
                history.labels.push(label_transition(
                    timestamp,
                    author.clone(),
                    item.from_string.as_deref(),
                    item.to_string.as_deref(),
                ));
            }
        }
    }

    // `sort_by_key` is stable: equal timestamps keep changelog order
    history.status.sort_by_key(|t| t.timestamp);
    history.priority_level.sort_by_key(|t| t.timestamp);
    history.labels.sort_by_key(|t| t.timestamp);

    history
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_level(value: Option<&str>) -> Option<i64> {
    let raw = value?;
    let parsed = parse_integer(raw);
    if parsed.is_none() && !raw.trim().is_empty() {
        tracing::warn!(value = raw, "Non-numeric priority level in changelog");
    }
    parsed
}

fn label_set(value: Option<&str>) -> BTreeSet<String> {
    value
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn label_transition(
    timestamp: chrono::DateTime<chrono::Utc>,
    author: String,
    from: Option<&str>,
    to: Option<&str>,
) -> LabelTransition {
    let from_value = label_set(from);
    let to_value = label_set(to);
    let added = to_value.difference(&from_value).cloned().collect();
    let removed = from_value.difference(&to_value).cloned().collect();

    LabelTransition {
        timestamp,
        author,
        from_value,
        to_value,
        added,
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeItem, ChangelogEntry, UserRef};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn item(field: &str, from: Option<&str>, to: Option<&str>) -> ChangeItem {
        ChangeItem {
            field: field.to_string(),
            field_id: None,
            from_string: from.map(str::to_string),
            to_string: to.map(str::to_string),
        }
    }

    fn entry(created: DateTime<Utc>, author: &str, items: Vec<ChangeItem>) -> ChangelogEntry {
        ChangelogEntry {
            created: Some(created),
            author: Some(UserRef {
                account_id: None,
                display_name: Some(author.to_string()),
            }),
            items,
        }
    }

    #[test]
    fn test_missing_changelog_is_empty() {
        let history = extract_transitions(None, &FieldsConfig::default());
        assert_eq!(history, TransitionHistory::default());
    }

    #[test]
    fn test_routes_fields_and_sorts() {
        let changelog = Changelog {
            histories: vec![
                entry(
                    at(5, 0),
                    "bob",
                    vec![
                        item("status", Some("In Progress"), Some("Done")),
                        item("Priority Level", Some("5"), None),
                    ],
                ),
                entry(
                    at(2, 0),
                    "ada",
                    vec![
                        item("status", Some("Open"), Some("In Progress")),
                        item("Priority Level", None, Some("5")),
                        item("assignee", None, Some("Ada")),
                    ],
                ),
            ],
        };

        let history = extract_transitions(Some(&changelog), &FieldsConfig::default());

        assert_eq!(history.status.len(), 2);
        assert_eq!(history.status[0].timestamp, at(2, 0));
        assert_eq!(history.status[0].to_value.as_deref(), Some("In Progress"));
        assert_eq!(history.status[1].author, "bob");

        assert_eq!(history.priority_level.len(), 2);
        assert_eq!(history.priority_level[0].from_value, None);
        assert_eq!(history.priority_level[0].to_value, Some(5));
        assert_eq!(history.priority_level[1].to_value, None);
        assert!(history.labels.is_empty());
    }

    #[test]
    fn test_priority_level_matched_by_field_id() {
        let mut by_id = item("Rank Bucket", Some("20"), Some("150"));
        by_id.field_id = Some("customfield_11129".to_string());
        let changelog = Changelog {
            histories: vec![entry(at(3, 0), "ada", vec![by_id])],
        };

        let history = extract_transitions(Some(&changelog), &FieldsConfig::default());
        assert_eq!(history.priority_level.len(), 1);
        assert_eq!(history.priority_level[0].from_value, Some(20));
        assert_eq!(history.priority_level[0].to_value, Some(150));
    }

    #[test]
    fn test_non_numeric_priority_level_becomes_none() {
        let changelog = Changelog {
            histories: vec![entry(
                at(3, 0),
                "ada",
                vec![item("Priority Level", Some("urgent"), Some("7"))],
            )],
        };

        let history = extract_transitions(Some(&changelog), &FieldsConfig::default());
        assert_eq!(history.priority_level[0].from_value, None);
        assert_eq!(history.priority_level[0].to_value, Some(7));
    }

    #[test]
    fn test_label_sets_and_diff() {
        let changelog = Changelog {
            histories: vec![entry(
                at(4, 0),
                "ada",
                vec![item(
                    "labels",
                    Some("backend src-bug-fix"),
                    Some("backend src-feature urgent"),
                )],
            )],
        };

        let history = extract_transitions(Some(&changelog), &FieldsConfig::default());
        let labels = &history.labels[0];
        assert_eq!(labels.from_value.len(), 2);
        assert_eq!(labels.to_value.len(), 3);
        assert!(labels.added.contains("src-feature"));
        assert!(labels.added.contains("urgent"));
        assert_eq!(labels.removed.iter().collect::<Vec<_>>(), vec!["src-bug-fix"]);
    }

    #[test]
    fn test_equal_timestamps_keep_changelog_order() {
        let changelog = Changelog {
            histories: vec![
                entry(at(6, 0), "ada", vec![item("status", Some("A"), Some("B"))]),
                entry(at(6, 0), "bob", vec![item("status", Some("B"), Some("C"))]),
                entry(at(1, 0), "cy", vec![item("status", None, Some("A"))]),
            ],
        };

        let history = extract_transitions(Some(&changelog), &FieldsConfig::default());
        let authors: Vec<_> = history.status.iter().map(|t| t.author.as_str()).collect();
        assert_eq!(authors, vec!["cy", "ada", "bob"]);
        assert!(history
            .status
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_entry_without_timestamp_is_skipped() {
        let mut undated = entry(at(1, 0), "ada", vec![item("status", None, Some("Open"))]);
        undated.created = None;
        let changelog = Changelog {
            histories: vec![undated],
        };

        let history = extract_transitions(Some(&changelog), &FieldsConfig::default());
        assert!(history.status.is_empty());
    }
}
