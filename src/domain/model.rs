use crate::utils::error::Result;
use crate::utils::validation::{
    validate_date_order, validate_non_empty_string, validate_positive_number, Validate,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    pub currency: String,
}

impl Price {
    pub fn eur(amount: f64) -> Self {
        Self {
            amount,
            currency: "EUR".to_string(),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

/// 飛行時間，以分鐘為單位
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripDuration {
    minutes: u32,
}

impl TripDuration {
    pub fn from_minutes(minutes: u32) -> Self {
        Self { minutes }
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }
}

impl fmt::Display for TripDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h{:02}m", self.minutes / 60, self.minutes % 60)
    }
}

/// One flight offer as shown on the results page.
///
/// Clock times are the ones printed on the result card; the calendar date comes
/// from the [`SearchQuery`] that produced the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub rank: u32,
    pub price: Price,
    pub airline: String,
    pub outbound_departure: Option<NaiveTime>,
    pub outbound_arrival: Option<NaiveTime>,
    pub return_departure: Option<NaiveTime>,
    pub return_arrival: Option<NaiveTime>,
    pub outbound_stops: u32,
    pub return_stops: u32,
    pub outbound_duration: Option<TripDuration>,
    pub return_duration: Option<TripDuration>,
    pub booking_url: String,
}

impl FlightRecord {
    /// 只有必填欄位的記錄，其餘欄位使用預設值
    pub fn new(price: Price, airline: impl Into<String>) -> Self {
        Self {
            rank: 0,
            price,
            airline: airline.into(),
            outbound_departure: None,
            outbound_arrival: None,
            return_departure: None,
            return_arrival: None,
            outbound_stops: 0,
            return_stops: 0,
            outbound_duration: None,
            return_duration: None,
            booking_url: String::new(),
        }
    }

    pub fn is_one_way(&self) -> bool {
        self.return_departure.is_none() && self.return_arrival.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passengers {
    pub adults: u32,
    pub children: u32,
}

impl Default for Passengers {
    fn default() -> Self {
        Self {
            adults: 1,
            children: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub origin: String,
    pub destination: String,
    pub date_range: Option<DateRange>,
    pub passengers: Passengers,
}

impl SearchQuery {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            date_range: None,
            passengers: Passengers::default(),
        }
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange { start, end });
        self
    }

    pub fn with_passengers(mut self, adults: u32, children: u32) -> Self {
        self.passengers = Passengers { adults, children };
        self
    }

    pub fn route(&self) -> String {
        format!("{} → {}", self.origin, self.destination)
    }
}

impl Validate for SearchQuery {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("origin", &self.origin)?;
        validate_non_empty_string("destination", &self.destination)?;
        validate_positive_number("adults", self.passengers.adults as usize, 1)?;
        if let Some(range) = &self.date_range {
            validate_date_order("return", range.start, range.end)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    GoodDeal,
    Exceptional,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::GoodDeal => write!(f, "good_deal"),
            Severity::Exceptional => write!(f, "exceptional"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub flight: FlightRecord,
    pub threshold: f64,
    pub severity: Severity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_duration_display() {
        assert_eq!(TripDuration::from_minutes(125).to_string(), "2h05m");
        assert_eq!(TripDuration::from_minutes(45).to_string(), "0h45m");
    }

    #[test]
    fn test_severity_serializes_snake_case() {
        let json = serde_json::to_string(&Severity::GoodDeal).unwrap();
        assert_eq!(json, "\"good_deal\"");
        let parsed: Severity = serde_json::from_str("\"exceptional\"").unwrap();
        assert_eq!(parsed, Severity::Exceptional);
    }

    #[test]
    fn test_new_record_defaults_to_one_way_sentinels() {
        let record = FlightRecord::new(Price::eur(99.0), "Iberia");
        assert_eq!(record.outbound_stops, 0);
        assert!(record.outbound_duration.is_none());
        assert!(record.booking_url.is_empty());
        assert!(record.is_one_way());
    }

    #[test]
    fn test_query_validation() {
        let date = |d| NaiveDate::from_ymd_opt(2025, 6, d).unwrap();

        assert!(SearchQuery::new("Madrid", "Paris").validate().is_ok());
        assert!(SearchQuery::new("Madrid", "Paris")
            .with_dates(date(1), date(1))
            .validate()
            .is_ok());
        assert!(SearchQuery::new("  ", "Paris").validate().is_err());
        assert!(SearchQuery::new("Madrid", "Paris")
            .with_dates(date(10), date(3))
            .validate()
            .is_err());
        assert!(SearchQuery::new("Madrid", "Paris")
            .with_passengers(0, 2)
            .validate()
            .is_err());
    }
}
