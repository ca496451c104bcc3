//! Average ticket age per priority category.

use serde::Serialize;

use super::intervals::AggregatedPeriod;
use crate::types::PriorityCategory;

/// Mean `age_in_days` per category within one period (0 when empty)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageAgePeriod {
    pub date: String,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    pub unknown: i64,
}

/// Average age per category for each period
pub fn average_age_series(periods: &[AggregatedPeriod]) -> Vec<AverageAgePeriod> {
    periods
        .iter()
        .map(|period| {
            let mean = |category: PriorityCategory| {
                mean_rounded(
                    period
                        .tickets
                        .iter()
                        .filter(|t| t.priority_category == category)
                        .map(|t| t.age_in_days),
                )
            };
            AverageAgePeriod {
                date: period.date.clone(),
                high: mean(PriorityCategory::High),
                medium: mean(PriorityCategory::Medium),
                low: mean(PriorityCategory::Low),
                unknown: mean(PriorityCategory::Unknown),
            }
        })
        .collect()
}

fn mean_rounded(values: impl Iterator<Item = i64>) -> i64 {
    let (sum, count) = values.fold((0i64, 0i64), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0
    } else {
        (sum as f64 / count as f64).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::intervals::{aggregate, Interval};
    use crate::analytics::test_support::ticket;

    #[test]
    fn test_average_per_category() {
        let mut tickets = vec![
            ticket("A", "2024-01-03T00:00:00Z", Some(1), &[]),
            ticket("B", "2024-01-03T00:00:00Z", Some(2), &[]),
            ticket("C", "2024-01-03T00:00:00Z", Some(40), &[]),
        ];
        tickets[0].age_in_days = 10;
        tickets[1].age_in_days = 13;
        tickets[2].age_in_days = 7;

        let series = average_age_series(&aggregate(&tickets, Interval::Daily));

        assert_eq!(series.len(), 1);
        // 11.5 rounds away from zero
        assert_eq!(series[0].high, 12);
        assert_eq!(series[0].medium, 7);
        assert_eq!(series[0].low, 0);
        assert_eq!(series[0].unknown, 0);
    }

    #[test]
    fn test_empty_category_is_zero() {
        assert_eq!(mean_rounded(std::iter::empty()), 0);
        assert!(average_age_series(&[]).is_empty());
    }
}
