//! Month-by-month price calendar: one search per calendar month.

use crate::core::summary::PriceStats;
use crate::domain::model::{DateRange, FlightRecord};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Whole calendar month `offset` months after the month containing `from`.
pub fn month_range(from: NaiveDate, offset: u32) -> Option<DateRange> {
    let start = from.with_day(1)?.checked_add_months(Months::new(offset))?;
    let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
    Some(DateRange { start, end })
}

/// Outcome of one month of the sweep. `error` is set when that month's search
/// failed; the sweep carries on with the next month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthResult {
    pub period: DateRange,
    pub stats: Option<PriceStats>,
    pub cheapest: Option<FlightRecord>,
    pub error: Option<String>,
}

impl MonthResult {
    pub fn from_records(period: DateRange, records: &[FlightRecord]) -> Self {
        Self {
            period,
            stats: PriceStats::from_records(records),
            cheapest: records.first().cloned(),
            error: None,
        }
    }

    pub fn failed(period: DateRange, error: impl Into<String>) -> Self {
        Self {
            period,
            stats: None,
            cheapest: None,
            error: Some(error.into()),
        }
    }

    /// `2025-07`
    pub fn label(&self) -> String {
        self.period.start.format("%Y-%m").to_string()
    }
}

/// Month with the lowest average price among months that returned offers.
pub fn best_month(months: &[MonthResult]) -> Option<&MonthResult> {
    months
        .iter()
        .filter_map(|m| m.stats.map(|stats| (m, stats.average)))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(month, _)| month)
}
