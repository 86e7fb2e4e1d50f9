use crate::core::export::ExportFormat;
use crate::domain::model::SearchQuery;
use crate::utils::error::{Result, ScrapeError};
use crate::utils::validation::{
    validate_date_order, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, Validate,
};
use chrono::NaiveDate;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "flight-scout")]
#[command(about = "Scrape flight offers, rank them by price and export CSV/HTML/JSON reports")]
pub struct CliConfig {
    /// Departure city
    #[arg(long)]
    pub origin: String,

    /// Arrival city
    #[arg(long)]
    pub destination: String,

    /// Outbound date (YYYY-MM-DD)
    #[arg(long)]
    pub depart: Option<NaiveDate>,

    /// Return date (YYYY-MM-DD)
    #[arg(long = "return")]
    pub return_date: Option<NaiveDate>,

    /// Search each of the next N calendar months (1-12) and report the cheapest
    #[arg(long, conflicts_with_all = ["depart", "return_date"])]
    pub months: Option<u32>,

    #[arg(long, default_value = "1")]
    pub adults: u32,

    #[arg(long, default_value = "0")]
    pub children: u32,

    /// Connect to the remote browser in BROWSER_PROXY_URL
    #[arg(long)]
    pub proxy: bool,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Number of cheapest offers to keep (default from config, 5)
    #[arg(long)]
    pub top: Option<usize>,

    /// Output formats; repeat or comma-separate (default: all)
    #[arg(long = "format", value_enum, value_delimiter = ',')]
    pub formats: Vec<ExportFormat>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per stage")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Show the resolved run without opening a browser")]
    pub dry_run: bool,
}

impl CliConfig {
    pub fn to_query(&self) -> SearchQuery {
        let mut query = SearchQuery::new(self.origin.trim(), self.destination.trim())
            .with_passengers(self.adults, self.children);
        if let (Some(start), Some(end)) = (self.depart, self.return_date) {
            query = query.with_dates(start, end);
        }
        query
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("origin", &self.origin)?;
        validate_non_empty_string("destination", &self.destination)?;
        validate_path("output_path", &self.output_path)?;
        validate_positive_number("adults", self.adults as usize, 1)?;
        if let Some(top) = self.top {
            validate_positive_number("top", top, 1)?;
        }
        if let Some(months) = self.months {
            validate_range("months", months, 1, 12)?;
        }

        match (self.depart, self.return_date) {
            (Some(start), Some(end)) => validate_date_order("return", start, end),
            (None, None) => Ok(()),
            (Some(_), None) => Err(ScrapeError::MissingConfigError {
                field: "return".to_string(),
            }),
            (None, Some(_)) => Err(ScrapeError::MissingConfigError {
                field: "depart".to_string(),
            }),
        }
    }
}
