pub mod csv_export;
pub mod html_export;
pub mod json_export;
pub mod sweep_export;

use crate::core::sweep::MonthResult;
use crate::domain::model::{AlertRecord, FlightRecord, SearchQuery};
use crate::domain::ports::Storage;
use crate::utils::error::{Result, ScrapeError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use csv_export::{render_csv, CSV_COLUMNS};
pub use html_export::render_html;
pub use json_export::{parse_json, render_json, ExportDocument};
pub use sweep_export::{render_calendar_csv, render_calendar_json, CALENDAR_COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Html,
    Json,
}

impl ExportFormat {
    pub fn all() -> &'static [ExportFormat] {
        &[ExportFormat::Csv, ExportFormat::Html, ExportFormat::Json]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Ranked records of one run, plus what produced them.
#[derive(Debug, Clone, Copy)]
pub struct ExportBatch<'a> {
    pub query: &'a SearchQuery,
    pub generated_at: DateTime<Utc>,
    pub records: &'a [FlightRecord],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub label: String,
    pub location: String,
}

#[derive(Debug, Default)]
pub struct ExportOutcome {
    pub artifacts: Vec<Artifact>,
    pub failures: Vec<ScrapeError>,
}

fn slug(text: &str) -> String {
    let mut out = String::new();
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// `{prefix}_{origin}_{destination}_{YYYYmmdd_HHMMSS}.{ext}`
pub fn artifact_name(
    prefix: &str,
    query: &SearchQuery,
    generated_at: DateTime<Utc>,
    extension: &str,
) -> String {
    format!(
        "{}_{}_{}_{}.{}",
        prefix,
        slug(&query.origin),
        slug(&query.destination),
        generated_at.format("%Y%m%d_%H%M%S"),
        extension
    )
}

pub fn render(format: ExportFormat, batch: &ExportBatch<'_>) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => render_csv(batch.records),
        ExportFormat::Html => Ok(render_html(batch).into_bytes()),
        ExportFormat::Json => render_json(batch),
    }
}

pub struct Exporter<S: Storage> {
    storage: S,
}

impl<S: Storage> Exporter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    async fn write(&self, label: &str, name: &str, data: &[u8]) -> Result<Artifact> {
        self.storage.write_file(name, data).await?;
        let location = self.storage.location(name);
        tracing::info!("✓ {} exported to: {}", label.to_uppercase(), location);
        Ok(Artifact {
            label: label.to_string(),
            location,
        })
    }

    pub async fn export(&self, format: ExportFormat, batch: &ExportBatch<'_>) -> Result<Artifact> {
        let name = artifact_name("flights", batch.query, batch.generated_at, format.extension());
        let result = match render(format, batch) {
            Ok(data) => self.write(format.extension(), &name, &data).await,
            Err(e) => Err(e),
        };
        result.map_err(|e| ScrapeError::export(format.to_string(), e))
    }

    /// Every format is attempted; a failure only drops that format's artifact.
    pub async fn export_all(
        &self,
        formats: &[ExportFormat],
        batch: &ExportBatch<'_>,
    ) -> ExportOutcome {
        let mut outcome = ExportOutcome::default();

        for format in formats {
            match self.export(*format, batch).await {
                Ok(artifact) => outcome.artifacts.push(artifact),
                Err(e) => {
                    tracing::error!("❌ {}", e);
                    outcome.failures.push(e);
                }
            }
        }

        outcome
    }

    /// Writes the month-by-month price calendar as CSV and JSON. HTML is not
    /// produced for a sweep.
    pub async fn export_sweep(
        &self,
        formats: &[ExportFormat],
        query: &SearchQuery,
        generated_at: DateTime<Utc>,
        months: &[MonthResult],
    ) -> ExportOutcome {
        let mut outcome = ExportOutcome::default();

        for format in formats {
            let rendered = match format {
                ExportFormat::Csv => render_calendar_csv(months),
                ExportFormat::Json => render_calendar_json(query, generated_at, months),
                ExportFormat::Html => {
                    tracing::debug!("Skipping HTML for the price calendar");
                    continue;
                }
            };
            let name = artifact_name("price_calendar", query, generated_at, format.extension());
            let result = match rendered {
                Ok(data) => self.write(format.extension(), &name, &data).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(artifact) => outcome.artifacts.push(artifact),
                Err(e) => {
                    let e = ScrapeError::export(format!("calendar {}", format), e);
                    tracing::error!("❌ {}", e);
                    outcome.failures.push(e);
                }
            }
        }

        outcome
    }

    /// Writes the alert log; nothing is written when there are no alerts.
    pub async fn export_alerts(
        &self,
        batch: &ExportBatch<'_>,
        alerts: &[AlertRecord],
        threshold: f64,
    ) -> Result<Option<Artifact>> {
        if alerts.is_empty() {
            tracing::info!("No price alerts to save");
            return Ok(None);
        }

        let name = artifact_name("price_alerts", batch.query, batch.generated_at, "json");
        let result = match json_export::render_alert_log(batch, alerts, threshold) {
            Ok(data) => self.write("alerts", &name, &data).await,
            Err(e) => Err(e),
        };
        result
            .map(Some)
            .map_err(|e| ScrapeError::export("alerts", e))
    }

    pub async fn save_screenshot(
        &self,
        stage: &str,
        taken_at: DateTime<Utc>,
        png: &[u8],
    ) -> Result<Artifact> {
        let name = format!("debug_{}_{}.png", slug(stage), taken_at.format("%Y%m%d_%H%M%S"));
        self.write("screenshot", &name, png).await
    }
}
