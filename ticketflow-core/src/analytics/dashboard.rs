//! The analytics bundle handed to the presentation layer.
//!
//! Everything here is recomputed from the ticket list on every call;
//! none of it is persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::age::{average_age_series, AverageAgePeriod};
use super::intervals::{aggregate, AggregatedPeriod, Interval};
use super::labels::{source_label_series, source_label_summary, SourceLabelPeriod, SourceLabelSummary};
use crate::ingest::refresh_ages;
use crate::types::{EnrichedTicket, PriorityCategory};

/// Ticket counts by category, over non-historical tickets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
    pub total: usize,
    /// Tickets that entered the active backlog
    pub incoming: usize,
    /// Tickets that left the active backlog
    pub outgoing: usize,
}

impl CategoryCounts {
    pub fn from_tickets(tickets: &[EnrichedTicket]) -> Self {
        let mut counts = Self::default();
        for ticket in tickets.iter().filter(|t| !t.historical) {
            match ticket.priority_category {
                PriorityCategory::High => counts.high += 1,
                PriorityCategory::Medium => counts.medium += 1,
                PriorityCategory::Low => counts.low += 1,
                PriorityCategory::Unknown => counts.unknown += 1,
            }
            counts.total += 1;
            if ticket.flow.is_incoming {
                counts.incoming += 1;
            }
            if ticket.flow.is_outgoing {
                counts.outgoing += 1;
            }
        }
        counts
    }
}

/// One value per interval
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntervalSeries<T> {
    pub daily: T,
    pub weekly: T,
    pub monthly: T,
}

impl<T> IntervalSeries<T> {
    /// Build each member with `f`
    pub fn build(mut f: impl FnMut(Interval) -> T) -> Self {
        Self {
            daily: f(Interval::Daily),
            weekly: f(Interval::Weekly),
            monthly: f(Interval::Monthly),
        }
    }

    pub fn get(&self, interval: Interval) -> &T {
        match interval {
            Interval::Daily => &self.daily,
            Interval::Weekly => &self.weekly,
            Interval::Monthly => &self.monthly,
        }
    }
}

/// Source label series and legend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceLabelReport {
    pub series: IntervalSeries<Vec<SourceLabelPeriod>>,
    /// Legend; per-period keys use the daily buckets
    pub summary: Vec<SourceLabelSummary>,
}

/// Complete analytics output for one ticket set
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub counts: CategoryCounts,
    pub tickets: Vec<EnrichedTicket>,
    pub time_series: IntervalSeries<Vec<AggregatedPeriod>>,
    pub source_labels: SourceLabelReport,
    pub average_age: IntervalSeries<Vec<AverageAgePeriod>>,
}

/// Compute every series for `tickets` as of `now`.
///
/// Ages are recomputed against `now` first, so a dashboard built from an
/// old snapshot reports current ages.
pub fn build_dashboard(mut tickets: Vec<EnrichedTicket>, now: DateTime<Utc>) -> Dashboard {
    for ticket in &mut tickets {
        refresh_ages(ticket, now);
    }
    let time_series = IntervalSeries::build(|interval| aggregate(&tickets, interval));

    let source_labels = SourceLabelReport {
        series: IntervalSeries::build(|interval| source_label_series(time_series.get(interval))),
        summary: source_label_summary(&tickets, &time_series.daily),
    };
    let average_age = IntervalSeries::build(|interval| average_age_series(time_series.get(interval)));

    tracing::debug!(
        tickets = tickets.len(),
        daily_periods = time_series.daily.len(),
        labels = source_labels.summary.len(),
        "Built dashboard"
    );

    Dashboard {
        generated_at: now,
        counts: CategoryCounts::from_tickets(&tickets),
        tickets,
        time_series,
        source_labels,
        average_age,
    }
}
