//! Source label breakdowns.
//!
//! The label universe is the union of source labels over every ticket, so
//! every period carries a field for every label, zero included.

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::intervals::AggregatedPeriod;
use crate::types::EnrichedTicket;

/// Colours assigned to labels by rank, cycling past the end
pub const LABEL_PALETTE: [&str; 10] = [
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac",
];

/// Per-period source label counts.
///
/// Serializes flat for charting: `{"date": ..., "<label>": n,
/// "<label>_tickets": [...]}` for every label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLabelPeriod {
    pub date: String,
    pub counts: BTreeMap<String, usize>,
    pub ticket_keys: BTreeMap<String, Vec<String>>,
}

impl Serialize for SourceLabelPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.counts.len() * 2))?;
        map.serialize_entry("date", &self.date)?;
        for (label, count) in &self.counts {
            map.serialize_entry(label, count)?;
            let keys = self.ticket_keys.get(label).map(Vec::as_slice).unwrap_or(&[]);
            map.serialize_entry(&format!("{}_tickets", label), keys)?;
        }
        map.end()
    }
}

/// One row of the label legend
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLabelSummary {
    pub name: String,
    /// Tickets carrying the label
    pub count: usize,
    /// Share of all tickets, one decimal
    pub percentage: f64,
    pub color: String,
    /// Bucket date → keys of tickets carrying the label in that bucket
    pub period_ticket_keys: BTreeMap<String, Vec<String>>,
}

/// Every source label seen on any ticket, sorted
pub fn label_universe<'a>(tickets: impl IntoIterator<Item = &'a EnrichedTicket>) -> BTreeSet<String> {
    tickets
        .into_iter()
        .flat_map(|t| t.source_labels.iter().cloned())
        .collect()
}

/// Per-period label counts and ticket keys
pub fn source_label_series(periods: &[AggregatedPeriod]) -> Vec<SourceLabelPeriod> {
    let labels = label_universe(periods.iter().flat_map(|p| p.tickets.iter()));

    periods
        .iter()
        .map(|period| {
            let mut row = SourceLabelPeriod {
                date: period.date.clone(),
                ..Default::default()
            };
            for label in &labels {
                let keys: Vec<String> = period
                    .tickets
                    .iter()
                    .filter(|t| t.source_labels.contains(label))
                    .map(|t| t.key.clone())
                    .collect();
                row.counts.insert(label.clone(), keys.len());
                row.ticket_keys.insert(label.clone(), keys);
            }
            row
        })
        .collect()
}

/// Legend entries, most frequent label first (ties by name)
pub fn source_label_summary(
    tickets: &[EnrichedTicket],
    periods: &[AggregatedPeriod],
) -> Vec<SourceLabelSummary> {
    let total = tickets.len();
    let mut counts: Vec<(String, usize)> = label_universe(tickets)
        .into_iter()
        .map(|label| {
            let count = tickets
                .iter()
                .filter(|t| t.source_labels.contains(&label))
                .count();
            (label, count)
        })
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    counts
        .into_iter()
        .enumerate()
        .map(|(rank, (name, count))| {
            let period_ticket_keys = periods
                .iter()
                .filter_map(|p| {
                    let keys: Vec<String> = p
                        .tickets
                        .iter()
                        .filter(|t| t.source_labels.contains(&name))
                        .map(|t| t.key.clone())
                        .collect();
                    (!keys.is_empty()).then(|| (p.date.clone(), keys))
                })
                .collect();

            SourceLabelSummary {
                percentage: percentage(count, total),
                color: LABEL_PALETTE[rank % LABEL_PALETTE.len()].to_string(),
                name,
                count,
                period_ticket_keys,
            }
        })
        .collect()
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}
