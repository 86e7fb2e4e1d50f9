use crate::core::sweep::{best_month, MonthResult};
use crate::domain::model::{AlertRecord, FlightRecord, SearchQuery, Severity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

impl PriceStats {
    /// `None` for an empty batch
    pub fn from_records(records: &[FlightRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let prices = records.iter().map(|r| r.price.amount);
        let min = prices.clone().fold(f64::INFINITY, f64::min);
        let max = prices.clone().fold(f64::NEG_INFINITY, f64::max);
        let total: f64 = prices.sum();

        Some(Self {
            count: records.len(),
            min,
            max,
            average: total / records.len() as f64,
        })
    }
}

const RULE: &str = "======================================================================";

/// Console summary printed at the end of a run.
pub fn render_summary(
    query: &SearchQuery,
    records: &[FlightRecord],
    alerts: &[AlertRecord],
    threshold: f64,
) -> String {
    let mut lines = vec![
        RULE.to_string(),
        format!("FLIGHT PRICE ANALYSIS: {}", query.route()),
        RULE.to_string(),
    ];

    if let Some(range) = &query.date_range {
        lines.push(format!("Dates: {} → {}", range.start, range.end));
    }

    match (records.first(), PriceStats::from_records(records)) {
        (Some(best), Some(stats)) => {
            lines.push(String::new());
            lines.push(format!("🏆 BEST OFFER: {} with {}", best.price, best.airline));
            if !best.booking_url.is_empty() {
                lines.push(format!("   Book: {}", best.booking_url));
            }
            lines.push(format!(
                "   Range: {:.2} - {:.2} {} (average {:.2})",
                stats.min, stats.max, best.price.currency, stats.average
            ));
            lines.push(format!("   Offers kept: {}", stats.count));
        }
        _ => {
            lines.push(String::new());
            lines.push("No flights found for this search".to_string());
        }
    }

    push_alerts(&mut lines, alerts, threshold);
    lines.push(RULE.to_string());
    lines.join("\n")
}

/// Console summary of a month-by-month sweep.
pub fn render_sweep_summary(
    query: &SearchQuery,
    months: &[MonthResult],
    alerts: &[AlertRecord],
    threshold: f64,
) -> String {
    let mut lines = vec![
        RULE.to_string(),
        format!("PRICE CALENDAR: {}", query.route()),
        RULE.to_string(),
        String::new(),
    ];

    for month in months {
        let line = match (&month.error, month.stats, &month.cheapest) {
            (Some(error), _, _) => format!("   {}: ✗ {}", month.label(), error),
            (None, Some(stats), Some(best)) => format!(
                "   {}: average {:.2}, from {} with {} ({} offers)",
                month.label(),
                stats.average,
                best.price,
                best.airline,
                stats.count
            ),
            _ => format!("   {}: no flights found", month.label()),
        };
        lines.push(line);
    }

    lines.push(String::new());
    match best_month(months).and_then(|m| m.stats.map(|stats| (m, stats))) {
        Some((month, stats)) => lines.push(format!(
            "📅 BEST PERIOD: {} (average {:.2} EUR, {} → {})",
            month.label(),
            stats.average,
            month.period.start,
            month.period.end
        )),
        None => lines.push("No flights found in any month".to_string()),
    }

    push_alerts(&mut lines, alerts, threshold);
    lines.push(RULE.to_string());
    lines.join("\n")
}

fn push_alerts(lines: &mut Vec<String>, alerts: &[AlertRecord], threshold: f64) {
    lines.push(String::new());
    if alerts.is_empty() {
        lines.push(format!(
            "✓ No alerts - all prices at or above {:.0} threshold",
            threshold
        ));
    } else {
        lines.push(format!(
            "🔔 PRICE ALERTS ({} offers below {:.0}):",
            alerts.len(),
            threshold
        ));
        for alert in alerts {
            let marker = match alert.severity {
                Severity::Exceptional => "⭐",
                Severity::GoodDeal => "🎯",
            };
            lines.push(format!(
                "   {} #{} {}: {}",
                marker, alert.flight.rank, alert.flight.airline, alert.flight.price
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alert::evaluate_alerts;
    use crate::core::rank::rank;
    use crate::domain::model::Price;

    fn batch(prices: &[f64]) -> Vec<FlightRecord> {
        rank(
            prices
                .iter()
                .map(|p| FlightRecord::new(Price::eur(*p), "Iberia"))
                .collect(),
            5,
        )
    }

    #[test]
    fn test_price_stats() {
        let stats = PriceStats::from_records(&batch(&[45.0, 80.0, 200.0])).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 45.0);
        assert_eq!(stats.max, 200.0);
        assert!((stats.average - 108.333).abs() < 0.01);

        assert!(PriceStats::from_records(&[]).is_none());
    }

    #[test]
    fn test_summary_mentions_best_offer_and_alerts() {
        let query = SearchQuery::new("Madrid", "Paris");
        let records = batch(&[200.0, 45.0, 80.0]);
        let alerts = evaluate_alerts(&records, 150.0);

        let summary = render_summary(&query, &records, &alerts, 150.0);

        assert!(summary.contains("Madrid → Paris"));
        assert!(summary.contains("BEST OFFER: 45.00 EUR"));
        assert!(summary.contains("PRICE ALERTS (2 offers below 150)"));
    }

    #[test]
    fn test_summary_without_results() {
        let query = SearchQuery::new("Madrid", "Paris");
        let summary = render_summary(&query, &[], &[], 150.0);
        assert!(summary.contains("No flights found"));
        assert!(summary.contains("No alerts"));
    }

    #[test]
    fn test_sweep_summary_names_best_period() {
        let query = SearchQuery::new("Madrid", "Paris");
        let from = chrono::NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let pricey = batch(&[180.0, 220.0]);
        let cheap = batch(&[70.0, 90.0]);
        let months = vec![
            MonthResult::from_records(crate::core::sweep::month_range(from, 1).unwrap(), &pricey),
            MonthResult::from_records(crate::core::sweep::month_range(from, 2).unwrap(), &cheap),
            MonthResult::failed(crate::core::sweep::month_range(from, 3).unwrap(), "timed out"),
        ];
        let alerts = evaluate_alerts(&cheap, 150.0);

        let summary = render_sweep_summary(&query, &months, &alerts, 150.0);

        assert!(summary.contains("2025-07: average 200.00"));
        assert!(summary.contains("2025-09: ✗ timed out"));
        assert!(summary.contains("BEST PERIOD: 2025-08 (average 80.00 EUR, 2025-08-01 → 2025-08-31)"));
        assert!(summary.contains("PRICE ALERTS (2 offers below 150)"));
    }
}
