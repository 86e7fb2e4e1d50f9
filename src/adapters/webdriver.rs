//! W3C WebDriver client over plain HTTP.
//!
//! Works against a local chromedriver/geckodriver or a remote scraping browser
//! that exposes the WebDriver endpoint.

use crate::domain::ports::BrowserSession;
use crate::utils::error::{Result, ScrapeError};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;

/// W3C element reference key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub endpoint: String,
    pub headless: bool,
    pub browser_name: String,
    pub page_load_timeout: Duration,
    pub command_timeout: Duration,
    pub window_size: (u32, u32),
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9515".to_string(),
            headless: true,
            browser_name: "chrome".to_string(),
            page_load_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(60),
            window_size: (1920, 1080),
        }
    }
}

impl BrowserOptions {
    fn capabilities(&self) -> Value {
        let mut args = vec![format!(
            "--window-size={},{}",
            self.window_size.0, self.window_size.1
        )];
        if self.headless {
            args.push("--headless=new".to_string());
            args.push("--disable-gpu".to_string());
        }

        let mut always_match = json!({
            "browserName": self.browser_name,
            "pageLoadStrategy": "eager",
        });

        match self.browser_name.as_str() {
            "firefox" => {
                let ff_args: Vec<&str> = if self.headless { vec!["-headless"] } else { vec![] };
                always_match["moz:firefoxOptions"] = json!({ "args": ff_args });
            }
            _ => {
                always_match["goog:chromeOptions"] = json!({ "args": args });
            }
        }

        json!({ "capabilities": { "alwaysMatch": always_match } })
    }
}

pub struct WebDriverSession {
    client: Client,
    endpoint: String,
    session_id: String,
    closed: bool,
}

impl WebDriverSession {
    /// 建立新的瀏覽器 session
    pub async fn connect(options: &BrowserOptions) -> Result<Self> {
        let client = Client::builder().timeout(options.command_timeout).build()?;
        let endpoint = options.endpoint.trim_end_matches('/').to_string();

        tracing::info!("🌐 Opening browser session on {}", endpoint);

        let response = client
            .post(format!("{}/session", endpoint))
            .json(&options.capabilities())
            .send()
            .await?;
        let value = Self::read_value("new session", response).await?;

        let session_id = value
            .get("sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ScrapeError::webdriver("new session", "response has no sessionId"))?
            .to_string();

        tracing::debug!("WebDriver session id: {}", session_id);

        let session = Self {
            client,
            endpoint,
            session_id,
            closed: false,
        };

        let timeouts = session
            .command(
                Method::POST,
                "timeouts",
                Some(json!({ "pageLoad": options.page_load_timeout.as_millis() as u64 })),
            )
            .await;

        // 設定失敗時也要把遠端 session 關掉
        if let Err(e) = timeouts {
            let mut session = session;
            if let Err(close_err) = session.close().await {
                tracing::warn!("Failed to close browser session: {}", close_err);
            }
            return Err(e);
        }

        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn read_value(command: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body: Value = response.json().await?;
        let value = body.get("value").cloned().unwrap_or(Value::Null);

        if !status.is_success() {
            let error = value
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            let message = value
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            return Err(ScrapeError::webdriver(
                command,
                format!("{} ({}): {}", error, status, message),
            ));
        }

        Ok(value)
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/session/{}/{}", self.endpoint, self.session_id, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        Self::read_value(path, response).await
    }

    fn element_id(value: &Value, command: &str, selector: &str) -> Result<String> {
        value
            .get(ELEMENT_KEY)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ScrapeError::webdriver(command, format!("no element reference for '{}'", selector))
            })
    }

    async fn find_element(&self, selector: &str) -> Result<String> {
        let value = self
            .command(
                Method::POST,
                "element",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;
        Self::element_id(&value, "element", selector)
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<String>> {
        let value = self
            .command(
                Method::POST,
                "elements",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;

        value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| Self::element_id(item, "elements", selector))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn click_element(&self, element: &str) -> Result<()> {
        self.command(
            Method::POST,
            &format!("element/{}/click", element),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        tracing::debug!("Navigating to {}", url);
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        let value = self.command(Method::GET, "url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let element = self.find_element(selector).await?;
        self.click_element(&element).await
    }

    async fn click_within(&mut self, container: &str, index: usize, item: &str) -> Result<()> {
        let containers = self.find_elements(container).await?;
        let parent = containers.get(index).ok_or_else(|| {
            ScrapeError::webdriver(
                "elements",
                format!("only {} match(es) for '{}', wanted #{}", containers.len(), container, index),
            )
        })?;

        let value = self
            .command(
                Method::POST,
                &format!("element/{}/element", parent),
                Some(json!({ "using": "css selector", "value": item })),
            )
            .await?;
        let element = Self::element_id(&value, "element", item)?;
        self.click_element(&element).await
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<()> {
        let element = self.find_element(selector).await?;
        self.command(
            Method::POST,
            &format!("element/{}/clear", element),
            Some(json!({})),
        )
        .await?;
        self.command(
            Method::POST,
            &format!("element/{}/value", element),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn is_present(&mut self, selector: &str) -> Result<bool> {
        Ok(!self.find_elements(selector).await?.is_empty())
    }

    async fn page_source(&mut self) -> Result<String> {
        let value = self.command(Method::GET, "source", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ScrapeError::webdriver("source", "page source is not a string"))
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let value = self.command(Method::GET, "screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| ScrapeError::webdriver("screenshot", "screenshot is not a string"))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| ScrapeError::webdriver("screenshot", e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let url = format!("{}/session/{}", self.endpoint, self.session_id);
        let response = self.client.delete(&url).send().await?;
        Self::read_value("delete session", response).await?;
        tracing::debug!("WebDriver session {} closed", self.session_id);
        Ok(())
    }
}
