use crate::domain::model::{AlertRecord, FlightRecord, Severity};

/// Below this share of the threshold an offer is exceptional.
pub const EXCEPTIONAL_RATIO: f64 = 0.5;

/// Offers priced strictly below `threshold`, tagged by severity.
pub fn evaluate_alerts(records: &[FlightRecord], threshold: f64) -> Vec<AlertRecord> {
    let exceptional_below = threshold * EXCEPTIONAL_RATIO;

    records
        .iter()
        .filter(|record| record.price.amount < threshold)
        .map(|record| {
            let severity = if record.price.amount < exceptional_below {
                Severity::Exceptional
            } else {
                Severity::GoodDeal
            };
            AlertRecord {
                flight: record.clone(),
                threshold,
                severity,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Price;

    fn offer(amount: f64) -> FlightRecord {
        FlightRecord::new(Price::eur(amount), "Vueling")
    }

    #[test]
    fn test_severity_boundaries() {
        let threshold = 150.0;
        let alerts = evaluate_alerts(
            &[offer(0.4 * threshold), offer(0.9 * threshold), offer(threshold)],
            threshold,
        );

        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].severity, Severity::Exceptional);
        assert_eq!(alerts[1].severity, Severity::GoodDeal);
        assert!(alerts.iter().all(|a| a.flight.price.amount < threshold));
    }

    #[test]
    fn test_exactly_half_threshold_is_good_deal() {
        let alerts = evaluate_alerts(&[offer(75.0)], 150.0);
        assert_eq!(alerts[0].severity, Severity::GoodDeal);
    }

    #[test]
    fn test_madrid_paris_scenario() {
        let alerts = evaluate_alerts(&[offer(45.0), offer(80.0), offer(200.0)], 150.0);

        let summary: Vec<(f64, Severity)> = alerts
            .iter()
            .map(|a| (a.flight.price.amount, a.severity))
            .collect();
        assert_eq!(
            summary,
            vec![(45.0, Severity::Exceptional), (80.0, Severity::GoodDeal)]
        );
        assert!(alerts.iter().all(|a| a.threshold == 150.0));
    }
}
