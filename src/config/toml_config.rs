use crate::core::export::ExportFormat;
use crate::core::form::FormSelectors;
use crate::utils::error::{Result, ScrapeError};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub browser: Option<BrowserConfig>,
    pub timeouts: Option<TimeoutConfig>,
    pub alerts: Option<AlertConfig>,
    pub export: Option<ExportConfig>,
    pub form: Option<FormSelectors>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub webdriver_url: Option<String>,
    pub browser_name: Option<String>,
    pub base_url: Option<String>,
    pub proxy_url: Option<String>,
    pub popup_selectors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub page_load_ms: Option<u64>,
    pub results_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub short_wait_ms: Option<u64>,
    pub retry_delay_ms: Option<u64>,
    pub retry_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertConfig {
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    pub formats: Option<Vec<ExportFormat>>,
    pub top_n: Option<usize>,
    pub debug_screenshots: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${BROWSER_PROXY_URL})，找不到的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        use crate::utils::validation::{validate_positive_number, validate_url};

        if let Some(browser) = &self.browser {
            if let Some(url) = &browser.webdriver_url {
                validate_url("browser.webdriver_url", url)?;
            }
            if let Some(url) = &browser.base_url {
                validate_url("browser.base_url", url)?;
            }
        }

        if let Some(export) = &self.export {
            if let Some(top_n) = export.top_n {
                validate_positive_number("export.top_n", top_n, 1)?;
            }
        }

        if let Some(threshold) = self.alerts.as_ref().and_then(|a| a.threshold) {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(ScrapeError::InvalidConfigValueError {
                    field: "alerts.threshold".to_string(),
                    value: threshold.to_string(),
                    reason: "Threshold must be a positive number".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
