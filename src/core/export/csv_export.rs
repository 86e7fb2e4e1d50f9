use crate::domain::model::FlightRecord;
use crate::utils::error::{Result, ScrapeError};
use chrono::NaiveTime;

pub const CSV_COLUMNS: [&str; 12] = [
    "rank",
    "price_eur",
    "airline",
    "outbound_departure",
    "outbound_arrival",
    "return_departure",
    "return_arrival",
    "outbound_stops",
    "return_stops",
    "outbound_duration",
    "return_duration",
    "booking_url",
];

fn clock(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}

fn row(record: &FlightRecord) -> [String; 12] {
    [
        record.rank.to_string(),
        format!("{:.2}", record.price.amount),
        record.airline.clone(),
        clock(record.outbound_departure),
        clock(record.outbound_arrival),
        clock(record.return_departure),
        clock(record.return_arrival),
        record.outbound_stops.to_string(),
        record.return_stops.to_string(),
        record
            .outbound_duration
            .map(|d| d.to_string())
            .unwrap_or_default(),
        record
            .return_duration
            .map(|d| d.to_string())
            .unwrap_or_default(),
        record.booking_url.clone(),
    ]
}

/// Header row first, even for an empty batch, then one row per record in order.
pub fn render_csv(records: &[FlightRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(CSV_COLUMNS)?;
    for record in records {
        writer.write_record(&row(record))?;
    }

    writer
        .into_inner()
        .map_err(|e| ScrapeError::IoError(e.into_error()))
}
