#![allow(dead_code)]

use async_trait::async_trait;
use flight_scout::config::settings::Timeouts;
use flight_scout::core::form::FormSelectors;
use flight_scout::domain::ports::BrowserSession;
use flight_scout::utils::error::{Result, ScrapeError};
use flight_scout::Settings;
use scraper::{Html, Selector};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {}: {}", path.display(), e))
}

/// 測試用的短逾時設定
pub fn fast_settings() -> Settings {
    Settings {
        timeouts: Timeouts {
            page_load: Duration::from_secs(1),
            results: Duration::from_millis(200),
            poll_interval: Duration::from_millis(10),
            short_wait: Duration::ZERO,
            retry_delay: Duration::ZERO,
        },
        ..Settings::default()
    }
}

#[derive(Debug, Default)]
pub struct BrowserCalls {
    pub gotos: usize,
    pub clicks: Vec<String>,
    pub fills: Vec<(String, String)>,
    pub screenshots: usize,
    pub closed: usize,
}

/// In-memory browser serving one fixed page.
pub struct FakeBrowser {
    page: String,
    url: String,
    calls: Arc<Mutex<BrowserCalls>>,
    fail_navigation: bool,
    failing_fills: usize,
    failing_clicks: Option<(String, usize)>,
    submitted: bool,
    presence_error_after_submit: Option<&'static str>,
}

impl FakeBrowser {
    pub fn serving(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            url: "https://www.kayak.fr/flights/MAD-PAR".to_string(),
            calls: Arc::new(Mutex::new(BrowserCalls::default())),
            fail_navigation: false,
            failing_fills: 0,
            failing_clicks: None,
            submitted: false,
            presence_error_after_submit: None,
        }
    }

    pub fn unreachable_site(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    /// 前 n 次輸入都回傳 WebDriver 錯誤
    pub fn flaky_form(mut self, failures: usize) -> Self {
        self.failing_fills = failures;
        self
    }

    /// 前 n 次點擊 `selector` 被彈窗擋住
    pub fn flaky_click(mut self, selector: impl Into<String>, failures: usize) -> Self {
        self.failing_clicks = Some((selector.into(), failures));
        self
    }

    /// The driver drops the session once the search is submitted.
    pub fn lose_session_after_submit(mut self) -> Self {
        self.presence_error_after_submit = Some("invalid session id: session deleted");
        self
    }

    /// Result polling keeps hitting stale elements after the search is submitted.
    pub fn stale_results(mut self) -> Self {
        self.presence_error_after_submit = Some("stale element reference: element is not attached");
        self
    }

    pub fn calls(&self) -> Arc<Mutex<BrowserCalls>> {
        Arc::clone(&self.calls)
    }
}

fn page_has(page: &str, css: &str) -> bool {
    let document = Html::parse_document(page);
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).next().is_some(),
        Err(_) => false,
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn goto(&mut self, _url: &str) -> Result<()> {
        self.calls.lock().unwrap().gotos += 1;
        if self.fail_navigation {
            return Err(ScrapeError::webdriver("url", "net::ERR_NAME_NOT_RESOLVED"));
        }
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        if let Some((failing, remaining)) = &mut self.failing_clicks {
            if failing == selector && *remaining > 0 {
                *remaining -= 1;
                return Err(ScrapeError::webdriver(
                    "element/click",
                    "element click intercepted",
                ));
            }
        }
        if selector == FormSelectors::default().search_button {
            self.submitted = true;
        }
        self.calls.lock().unwrap().clicks.push(selector.to_string());
        Ok(())
    }

    async fn click_within(&mut self, container: &str, index: usize, item: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .clicks
            .push(format!("{} #{} {}", container, index, item));
        Ok(())
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<()> {
        if self.failing_fills > 0 {
            self.failing_fills -= 1;
            return Err(ScrapeError::webdriver(
                "element",
                "element click intercepted",
            ));
        }
        self.calls
            .lock()
            .unwrap()
            .fills
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn is_present(&mut self, selector: &str) -> Result<bool> {
        if let (true, Some(message)) = (self.submitted, self.presence_error_after_submit) {
            return Err(ScrapeError::webdriver("elements", message));
        }
        Ok(page_has(&self.page, selector))
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(self.page.clone())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().screenshots += 1;
        Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
    }

    async fn close(&mut self) -> Result<()> {
        self.calls.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// Files in `dir` whose name starts with `prefix` and ends with `suffix`.
pub fn files_matching(dir: &Path, prefix: &str, suffix: &str) -> Vec<std::path::PathBuf> {
    let mut found: Vec<_> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| {
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with(prefix) && n.ends_with(suffix))
                        .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();
    found.sort();
    found
}
