//! Backlog flow classification
//!
//! The active backlog is every ticket with a priority level below 100.
//! Residency is reconstructed from the priority level history alone, since
//! workflow status and priority level are edited independently in Jira.
//!
//! Only the first entry and the first exit are recorded. A ticket that
//! leaves and comes back keeps its original dates.

use chrono::{DateTime, Utc};

use crate::types::{PriorityFlowFlags, PriorityLevelTransition};

/// Highest priority level still inside the active backlog
pub const ACTIVE_BACKLOG_MAX: i64 = 99;

/// Derive incoming/outgoing flags for one ticket.
///
/// `transitions` must be sorted ascending by timestamp, as produced by
/// [`super::transitions::extract_transitions`].
pub fn classify_flow(
    transitions: &[PriorityLevelTransition],
    current_level: Option<i64>,
    created: DateTime<Utc>,
) -> PriorityFlowFlags {
    PriorityFlowFlags::new(
        incoming_date(transitions, current_level, created),
        outgoing_date(transitions, current_level, created),
    )
}

fn incoming_date(
    transitions: &[PriorityLevelTransition],
    current_level: Option<i64>,
    created: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    // First assignment of a level
    if let Some(first_assignment) = transitions
        .iter()
        .find(|t| t.from_value.is_none() && t.to_value.is_some())
    {
        return Some(first_assignment.timestamp);
    }

    match transitions.first() {
        // Already prioritized before the tracked history begins
        Some(earliest) if earliest.from_value.is_some() => Some(created),
        Some(_) => None,
        // Created already prioritized
        None if current_level.is_some() => Some(created),
        None => None,
    }
}

fn outgoing_date(
    transitions: &[PriorityLevelTransition],
    current_level: Option<i64>,
    created: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if transitions.is_empty() {
        return match current_level {
            Some(level) if level > ACTIVE_BACKLOG_MAX => Some(created),
            _ => None,
        };
    }

    transitions
        .iter()
        .find(|t| is_exit(t))
        .map(|t| t.timestamp)
}

/// Cleared, or raised from inside the backlog (or from nothing) past 99
fn is_exit(transition: &PriorityLevelTransition) -> bool {
    match transition.to_value {
        None => true,
        Some(to) if to > ACTIVE_BACKLOG_MAX => transition
            .from_value
            .map_or(true, |from| from <= ACTIVE_BACKLOG_MAX),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn level(at: DateTime<Utc>, from: Option<i64>, to: Option<i64>) -> PriorityLevelTransition {
        PriorityLevelTransition {
            timestamp: at,
            author: "ada".to_string(),
            from_value: from,
            to_value: to,
        }
    }

    #[test]
    fn test_first_assignment_is_incoming() {
        let transitions = vec![level(day(5), None, Some(5))];
        let flags = classify_flow(&transitions, Some(5), day(1));
        assert!(flags.is_incoming);
        assert_eq!(flags.incoming_date, Some(day(5)));
        assert!(!flags.is_outgoing);
        assert_eq!(flags.outgoing_date, None);
    }

    #[test]
    fn test_prioritized_before_history_uses_creation() {
        let transitions = vec![level(day(4), Some(30), Some(8))];
        let flags = classify_flow(&transitions, Some(8), day(1));
        assert_eq!(flags.incoming_date, Some(day(1)));
        assert!(!flags.is_outgoing);
    }

    #[test]
    fn test_created_prioritized_without_history() {
        let flags = classify_flow(&[], Some(42), day(2));
        assert_eq!(flags.incoming_date, Some(day(2)));
        assert!(!flags.is_outgoing);
    }

    #[test]
    fn test_never_prioritized() {
        let flags = classify_flow(&[], None, day(2));
        assert_eq!(flags, PriorityFlowFlags::default());
    }

    #[test]
    fn test_created_out_of_range_is_incoming_and_outgoing() {
        let flags = classify_flow(&[], Some(150), day(3));
        assert_eq!(flags.incoming_date, Some(day(3)));
        assert_eq!(flags.outgoing_date, Some(day(3)));
        assert!(flags.is_incoming && flags.is_outgoing);
    }

    #[test]
    fn test_cleared_priority_is_outgoing() {
        let transitions = vec![
            level(day(2), None, Some(5)),
            level(day(9), Some(5), None),
        ];
        let flags = classify_flow(&transitions, None, day(1));
        assert_eq!(flags.incoming_date, Some(day(2)));
        assert_eq!(flags.outgoing_date, Some(day(9)));
    }

    #[test]
    fn test_raised_past_active_range_is_outgoing() {
        let transitions = vec![
            level(day(2), None, Some(50)),
            level(day(6), Some(50), Some(120)),
            level(day(8), Some(120), Some(200)),
        ];
        let flags = classify_flow(&transitions, Some(200), day(1));
        assert_eq!(flags.outgoing_date, Some(day(6)));
    }

    #[test]
    fn test_move_within_low_range_is_not_outgoing() {
        let transitions = vec![level(day(6), Some(120), Some(200))];
        let flags = classify_flow(&transitions, Some(200), day(1));
        assert!(!flags.is_outgoing);
        // Had a level before the history began
        assert_eq!(flags.incoming_date, Some(day(1)));
    }

    #[test]
    fn test_only_first_cycle_is_recorded() {
        let transitions = vec![
            level(day(2), None, Some(5)),
            level(day(4), Some(5), None),
            level(day(6), None, Some(7)),
            level(day(8), Some(7), None),
        ];
        let flags = classify_flow(&transitions, None, day(1));
        assert_eq!(flags.incoming_date, Some(day(2)));
        assert_eq!(flags.outgoing_date, Some(day(4)));
    }

    #[test]
    fn test_first_transition_clearing_nothing_is_not_incoming() {
        let transitions = vec![level(day(3), None, None)];
        let flags = classify_flow(&transitions, None, day(1));
        assert!(!flags.is_incoming);
        assert_eq!(flags.outgoing_date, Some(day(3)));
    }
}
