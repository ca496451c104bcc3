//! Analytics over enriched tickets
//!
//! Provides the time series the dashboard renders:
//! - Ticket counts per priority category, bucketed daily/weekly/monthly
//! - Source label occurrence per bucket, plus a ranked legend
//! - Average ticket age per category per bucket
//!
//! All series are derived from a ticket slice on demand; see
//! [`build_dashboard`] for the combined bundle.

pub mod age;
pub mod dashboard;
pub mod intervals;
pub mod labels;

pub use age::{average_age_series, AverageAgePeriod};
pub use dashboard::{build_dashboard, CategoryCounts, Dashboard, IntervalSeries, SourceLabelReport};
pub use intervals::{aggregate, AggregatedPeriod, Interval};
pub use labels::{
    source_label_series, source_label_summary, SourceLabelPeriod, SourceLabelSummary,
    LABEL_PALETTE,
};
