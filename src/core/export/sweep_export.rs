use crate::core::sweep::{best_month, MonthResult};
use crate::domain::model::SearchQuery;
use crate::utils::error::{Result, ScrapeError};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const CALENDAR_COLUMNS: [&str; 8] = [
    "month", "start", "end", "offers", "min_eur", "max_eur", "average_eur", "status",
];

fn row(month: &MonthResult) -> [String; 8] {
    let amount = |value: Option<f64>| value.map(|v| format!("{:.2}", v)).unwrap_or_default();
    let stats = month.stats;
    let status = match (&month.error, stats) {
        (Some(error), _) => format!("failed: {}", error),
        (None, Some(_)) => "ok".to_string(),
        (None, None) => "no offers".to_string(),
    };
    [
        month.label(),
        month.period.start.to_string(),
        month.period.end.to_string(),
        stats.map(|s| s.count).unwrap_or(0).to_string(),
        amount(stats.map(|s| s.min)),
        amount(stats.map(|s| s.max)),
        amount(stats.map(|s| s.average)),
        status,
    ]
}

/// One row per month, failed months included.
pub fn render_calendar_csv(months: &[MonthResult]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(CALENDAR_COLUMNS)?;
    for month in months {
        writer.write_record(&row(month))?;
    }

    writer
        .into_inner()
        .map_err(|e| ScrapeError::IoError(e.into_error()))
}

#[derive(Serialize)]
struct Calendar<'a> {
    route: String,
    generated_at: DateTime<Utc>,
    months: &'a [MonthResult],
    best_month: Option<String>,
}

pub fn render_calendar_json(
    query: &SearchQuery,
    generated_at: DateTime<Utc>,
    months: &[MonthResult],
) -> Result<Vec<u8>> {
    let calendar = Calendar {
        route: query.route(),
        generated_at,
        months,
        best_month: best_month(months).map(MonthResult::label),
    };
    Ok(serde_json::to_vec_pretty(&calendar)?)
}
