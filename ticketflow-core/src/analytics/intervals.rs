//! Time bucketing of tickets by creation date.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::{EnrichedTicket, PriorityCategory};

/// Bucket width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// Calendar day of creation
    Daily,
    /// Week starting on the Sunday on or before creation
    Weekly,
    /// Calendar month of creation
    Monthly,
}

impl Interval {
    pub const ALL: [Interval; 3] = [Interval::Daily, Interval::Weekly, Interval::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
            Interval::Monthly => "monthly",
        }
    }

    /// First day of the bucket containing `date`
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Interval::Daily => date,
            Interval::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
            }
            Interval::Monthly => NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .into_iter()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Interval::ALL.iter().map(Interval::as_str).collect();
                format!("unknown interval: {} (expected {})", s, names.join(", "))
            })
    }
}

/// Tickets created within one bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPeriod {
    /// Bucket start as `YYYY-MM-DD`
    pub date: String,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
    pub total: usize,
    pub tickets: Vec<EnrichedTicket>,
}

impl AggregatedPeriod {
    fn new(date: NaiveDate) -> Self {
        Self {
            date: date.format("%Y-%m-%d").to_string(),
            ..Default::default()
        }
    }

    fn push(&mut self, ticket: &EnrichedTicket) {
        match ticket.priority_category {
            PriorityCategory::High => self.high += 1,
            PriorityCategory::Medium => self.medium += 1,
            PriorityCategory::Low => self.low += 1,
            PriorityCategory::Unknown => self.unknown += 1,
        }
        self.total += 1;
        self.tickets.push(ticket.clone());
    }

    /// Count for one category
    pub fn count(&self, category: PriorityCategory) -> usize {
        match category {
            PriorityCategory::High => self.high,
            PriorityCategory::Medium => self.medium,
            PriorityCategory::Low => self.low,
            PriorityCategory::Unknown => self.unknown,
        }
    }
}

/// Group tickets into buckets, ascending by date.
pub fn aggregate(tickets: &[EnrichedTicket], interval: Interval) -> Vec<AggregatedPeriod> {
    let mut buckets: BTreeMap<NaiveDate, AggregatedPeriod> = BTreeMap::new();

    for ticket in tickets {
        let start = interval.bucket_start(ticket.created.date_naive());
        buckets
            .entry(start)
            .or_insert_with(|| AggregatedPeriod::new(start))
            .push(ticket);
    }

    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::ticket;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bucket_start() {
        // 2024-01-10 is a Wednesday
        let wed = date(2024, 1, 10);
        assert_eq!(Interval::Daily.bucket_start(wed), wed);
        assert_eq!(Interval::Weekly.bucket_start(wed), date(2024, 1, 7));
        assert_eq!(Interval::Monthly.bucket_start(wed), date(2024, 1, 1));

        let sunday = date(2024, 1, 7);
        assert_eq!(Interval::Weekly.bucket_start(sunday), sunday);

        // Week crossing a year boundary
        assert_eq!(Interval::Weekly.bucket_start(date(2025, 1, 2)), date(2024, 12, 29));
    }

    #[test]
    fn test_interval_from_str() {
        assert_eq!("weekly".parse::<Interval>().unwrap(), Interval::Weekly);
        let err = "hourly".parse::<Interval>().unwrap_err();
        assert_eq!(err, "unknown interval: hourly (expected daily, weekly, monthly)");
    }

    #[test]
    fn test_daily_counts_same_day() {
        let tickets = vec![
            ticket("A", "2024-01-03T09:00:00Z", Some(1), &[]),
            ticket("B", "2024-01-03T10:00:00Z", Some(2), &[]),
            ticket("C", "2024-01-03T11:00:00Z", Some(3), &[]),
            ticket("D", "2024-01-03T12:00:00Z", Some(20), &[]),
            ticket("E", "2024-01-03T13:00:00Z", Some(50), &[]),
            ticket("F", "2024-01-03T14:00:00Z", Some(300), &[]),
        ];

        let periods = aggregate(&tickets, Interval::Daily);

        assert_eq!(periods.len(), 1);
        let p = &periods[0];
        assert_eq!(p.date, "2024-01-03");
        assert_eq!((p.high, p.medium, p.low, p.unknown), (3, 2, 1, 0));
        assert_eq!(p.total, 6);
        assert_eq!(p.tickets.len(), 6);
    }

    #[test]
    fn test_periods_sorted_and_grouped() {
        let tickets = vec![
            ticket("A", "2024-02-15T00:00:00Z", Some(1), &[]),
            ticket("B", "2024-01-31T00:00:00Z", None, &[]),
            ticket("C", "2024-02-01T00:00:00Z", Some(150), &[]),
            ticket("D", "2024-01-02T00:00:00Z", Some(15), &[]),
        ];

        let monthly = aggregate(&tickets, Interval::Monthly);
        let dates: Vec<_> = monthly.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-02-01"]);
        assert_eq!(monthly[0].total, 2);
        assert_eq!(monthly[0].unknown, 1);
        assert_eq!(monthly[1].count(PriorityCategory::Low), 1);

        let weekly = aggregate(&tickets, Interval::Weekly);
        let dates: Vec<_> = weekly.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2023-12-31", "2024-01-28", "2024-02-11"]);
        assert_eq!(weekly[1].total, 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[], Interval::Weekly).is_empty());
    }
}
