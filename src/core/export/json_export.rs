use crate::core::export::ExportBatch;
use crate::domain::model::{AlertRecord, FlightRecord, SearchQuery};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{ query, generated_at, results }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub query: SearchQuery,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<FlightRecord>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    query: &'a SearchQuery,
    generated_at: DateTime<Utc>,
    results: &'a [FlightRecord],
}

#[derive(Serialize)]
struct AlertLog<'a> {
    route: String,
    threshold: f64,
    total_alerts: usize,
    generated_at: DateTime<Utc>,
    alerts: &'a [AlertRecord],
}

pub fn render_json(batch: &ExportBatch<'_>) -> Result<Vec<u8>> {
    let document = DocumentRef {
        query: batch.query,
        generated_at: batch.generated_at,
        results: batch.records,
    };
    Ok(serde_json::to_vec_pretty(&document)?)
}

pub fn parse_json(data: &[u8]) -> Result<ExportDocument> {
    Ok(serde_json::from_slice(data)?)
}

pub fn render_alert_log(
    batch: &ExportBatch<'_>,
    alerts: &[AlertRecord],
    threshold: f64,
) -> Result<Vec<u8>> {
    let log = AlertLog {
        route: batch.query.route(),
        threshold,
        total_alerts: alerts.len(),
        generated_at: batch.generated_at,
        alerts,
    };
    Ok(serde_json::to_vec_pretty(&log)?)
}
