use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Navigation failed during {stage}: {message}")]
    NavigationError { stage: String, message: String },

    #[error("Layout detection failed: {reason}")]
    LayoutDetectionError { reason: String },

    #[error("Record #{index} skipped: {reason}")]
    RecordExtractionError { index: usize, reason: String },

    #[error("Export to {format} failed: {source}")]
    ExportError {
        format: String,
        #[source]
        source: Box<ScrapeError>,
    },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Timed out after {waited_ms}ms while {stage}")]
    TimeoutError { stage: String, waited_ms: u64 },

    #[error("WebDriver command '{command}' failed: {message}")]
    WebDriverError { command: String, message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Run failed at {stage}: {source}")]
    StageError {
        stage: String,
        #[source]
        source: Box<ScrapeError>,
    },
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// W3C error codes meaning the browser session is gone.
const DEAD_SESSION_ERRORS: [&str; 3] = ["invalid session id", "no such window", "session not created"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Browser,
    Extraction,
    Export,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ScrapeError {
    pub fn navigation(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NavigationError {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn webdriver(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WebDriverError {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn export(format: impl Into<String>, source: ScrapeError) -> Self {
        Self::ExportError {
            format: format.into(),
            source: Box::new(source),
        }
    }

    pub fn at_stage(stage: impl Into<String>, source: ScrapeError) -> Self {
        Self::StageError {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// 錯誤的根本原因（剝掉 StageError 包裝）
    pub fn root(&self) -> &ScrapeError {
        match self {
            Self::StageError { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::NavigationError { .. }
            | Self::TimeoutError { .. }
            | Self::WebDriverError { .. }
            | Self::HttpError(_) => ErrorCategory::Browser,
            Self::LayoutDetectionError { .. } | Self::RecordExtractionError { .. } => {
                ErrorCategory::Extraction
            }
            Self::ExportError { .. } | Self::CsvError(_) | Self::SerializationError(_) => {
                ErrorCategory::Export
            }
            Self::IoError(_) => ErrorCategory::System,
            Self::StageError { source, .. } => source.category(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::RecordExtractionError { .. } => ErrorSeverity::Low,
            Self::ExportError { .. } | Self::TimeoutError { .. } => ErrorSeverity::Medium,
            Self::IoError(_) => ErrorSeverity::Critical,
            Self::StageError { source, .. } => source.severity(),
            _ => ErrorSeverity::High,
        }
    }

    /// 是否值得重試（瀏覽器層的暫時性錯誤）；session 已失效則不算
    pub fn is_transient(&self) -> bool {
        match self.root() {
            Self::WebDriverError { message, .. } => !DEAD_SESSION_ERRORS
                .iter()
                .any(|marker| message.contains(marker)),
            Self::HttpError(_) | Self::TimeoutError { .. } => true,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.root() {
            Self::InvalidConfigValueError { .. } | Self::MissingConfigError { .. } => {
                "Check the command line arguments and environment variables"
            }
            Self::TomlError(_) => "Fix the syntax of the TOML configuration file",
            Self::NavigationError { .. } | Self::WebDriverError { .. } | Self::HttpError(_) => {
                "Make sure the WebDriver server is running and the search site is reachable"
            }
            Self::TimeoutError { .. } => {
                "Increase the results timeout or retry later; the site may be slow"
            }
            Self::LayoutDetectionError { .. } => {
                "The results page changed; update the layout selector tables"
            }
            Self::RecordExtractionError { .. } => "No action needed; the offer was skipped",
            Self::ExportError { .. } | Self::CsvError(_) | Self::SerializationError(_) => {
                "Check that the output directory is writable"
            }
            Self::IoError(_) => "Check disk space and file permissions",
            Self::StageError { .. } => "Inspect the logs for the failing stage",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::StageError { stage, source } => {
                format!("Flight search failed while {}: {}", stage, source.root())
            }
            other => format!("Flight search failed: {}", other),
        }
    }
}
