use crate::config::toml_config::TomlConfig;
use crate::core::export::ExportFormat;
use crate::core::form::FormSelectors;
use crate::utils::error::{Result, ScrapeError};
use crate::utils::validation::{validate_positive_number, validate_url, Validate};
use std::time::Duration;

pub const DEFAULT_ALERT_THRESHOLD: f64 = 150.0;
pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_BASE_URL: &str = "https://www.kayak.fr";

#[derive(Debug, Clone, PartialEq)]
pub struct Timeouts {
    pub page_load: Duration,
    pub results: Duration,
    pub poll_interval: Duration,
    pub short_wait: Duration,
    pub retry_delay: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_load: Duration::from_millis(30_000),
            results: Duration::from_millis(30_000),
            poll_interval: Duration::from_millis(500),
            short_wait: Duration::from_millis(500),
            retry_delay: Duration::from_millis(1_000),
        }
    }
}

/// Run-wide settings, resolved once at startup and never re-read.
///
/// Precedence: built-in defaults, then the TOML file, then the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub alert_threshold: f64,
    pub proxy_url: Option<String>,
    pub debug_screenshots: bool,
    pub webdriver_url: String,
    pub browser_name: String,
    pub base_url: String,
    pub timeouts: Timeouts,
    pub retry_attempts: u32,
    pub top_n: usize,
    pub formats: Vec<ExportFormat>,
    pub popup_selectors: Vec<String>,
    pub form: FormSelectors,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            proxy_url: None,
            debug_screenshots: false,
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            browser_name: "chrome".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeouts: Timeouts::default(),
            retry_attempts: 3,
            top_n: DEFAULT_TOP_N,
            formats: ExportFormat::all().to_vec(),
            popup_selectors: vec![
                "button[id*='accept']".to_string(),
                "div[role='dialog'] button[aria-label*='Fermer']".to_string(),
                "div[role='dialog'] button[aria-label*='Close']".to_string(),
            ],
            form: FormSelectors::default(),
        }
    }
}

impl Settings {
    /// 從行程環境讀取設定
    pub fn from_env(file: Option<&TomlConfig>) -> Result<Self> {
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    pub fn resolve<F>(file: Option<&TomlConfig>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(file) = file {
            settings.apply_file(file);
        }
        settings.apply_env(lookup)?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_file(&mut self, file: &TomlConfig) {
        if let Some(browser) = &file.browser {
            if let Some(url) = &browser.webdriver_url {
                self.webdriver_url = url.clone();
            }
            if let Some(name) = &browser.browser_name {
                self.browser_name = name.clone();
            }
            if let Some(url) = &browser.base_url {
                self.base_url = url.clone();
            }
            if browser.proxy_url.is_some() {
                self.proxy_url = browser.proxy_url.clone();
            }
            if let Some(selectors) = &browser.popup_selectors {
                self.popup_selectors = selectors.clone();
            }
        }

        if let Some(t) = &file.timeouts {
            let ms = Duration::from_millis;
            if let Some(v) = t.page_load_ms {
                self.timeouts.page_load = ms(v);
            }
            if let Some(v) = t.results_ms {
                self.timeouts.results = ms(v);
            }
            if let Some(v) = t.poll_interval_ms {
                self.timeouts.poll_interval = ms(v);
            }
            if let Some(v) = t.short_wait_ms {
                self.timeouts.short_wait = ms(v);
            }
            if let Some(v) = t.retry_delay_ms {
                self.timeouts.retry_delay = ms(v);
            }
            if let Some(v) = t.retry_attempts {
                self.retry_attempts = v;
            }
        }

        if let Some(threshold) = file.alerts.as_ref().and_then(|a| a.threshold) {
            self.alert_threshold = threshold;
        }

        if let Some(export) = &file.export {
            if let Some(formats) = &export.formats {
                self.formats = formats.clone();
            }
            if let Some(top_n) = export.top_n {
                self.top_n = top_n;
            }
            if let Some(debug) = export.debug_screenshots {
                self.debug_screenshots = debug;
            }
        }

        if let Some(form) = &file.form {
            self.form = form.clone();
        }
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = non_empty(lookup("PRICE_ALERT_THRESHOLD")) {
            self.alert_threshold =
                raw.trim()
                    .parse()
                    .map_err(|_| ScrapeError::InvalidConfigValueError {
                        field: "PRICE_ALERT_THRESHOLD".to_string(),
                        value: raw.clone(),
                        reason: "Expected a number".to_string(),
                    })?;
        }

        if let Some(url) = non_empty(lookup("BROWSER_PROXY_URL")) {
            self.proxy_url = Some(url);
        }

        if let Some(raw) = non_empty(lookup("DEBUG_SCREENSHOTS")) {
            self.debug_screenshots = parse_flag("DEBUG_SCREENSHOTS", &raw)?;
        }

        if let Some(url) = non_empty(lookup("WEBDRIVER_URL")) {
            self.webdriver_url = url;
        }

        if let Some(url) = non_empty(lookup("SEARCH_BASE_URL")) {
            self.base_url = url;
        }

        Ok(())
    }

    /// 使用代理時連到遠端瀏覽器，否則連本機 WebDriver
    pub fn browser_endpoint(&self, use_proxy: bool) -> Result<&str> {
        if use_proxy {
            self.proxy_url
                .as_deref()
                .ok_or_else(|| ScrapeError::MissingConfigError {
                    field: "BROWSER_PROXY_URL".to_string(),
                })
        } else {
            Ok(&self.webdriver_url)
        }
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("webdriver_url", &self.webdriver_url)?;
        validate_url("base_url", &self.base_url)?;
        if let Some(proxy) = &self.proxy_url {
            validate_url("proxy_url", proxy)?;
        }
        validate_positive_number("top_n", self.top_n, 1)?;
        validate_positive_number("retry_attempts", self.retry_attempts as usize, 1)?;

        if !self.alert_threshold.is_finite() || self.alert_threshold <= 0.0 {
            return Err(ScrapeError::InvalidConfigValueError {
                field: "alert_threshold".to_string(),
                value: self.alert_threshold.to_string(),
                reason: "Threshold must be a positive number".to_string(),
            });
        }

        if self.formats.is_empty() {
            return Err(ScrapeError::InvalidConfigValueError {
                field: "formats".to_string(),
                value: String::new(),
                reason: "At least one export format is required".to_string(),
            });
        }

        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_flag(field: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ScrapeError::InvalidConfigValueError {
            field: field.to_string(),
            value: raw.to_string(),
            reason: "Expected true/false".to_string(),
        }),
    }
}
