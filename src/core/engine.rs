use crate::config::Settings;
use crate::core::alert::evaluate_alerts;
use crate::core::export::{Artifact, ExportBatch, ExportOutcome, Exporter};
use crate::core::extract::{extract_records, Extraction};
use crate::core::form::{form_actions, perform};
use crate::core::layout::{builtin_layouts, detect_layout, selectors_for, Layout, LayoutSelectors};
use crate::core::rank::rank;
use crate::core::sweep::{best_month, month_range, MonthResult};
use crate::domain::model::{AlertRecord, FlightRecord, SearchQuery};
use crate::domain::ports::{BrowserSession, Storage};
use crate::utils::error::{Result, ScrapeError};
use crate::utils::monitor::SystemMonitor;
use crate::utils::validation::Validate;
use chrono::{DateTime, NaiveDate, Utc};
use scraper::Html;
use std::fmt;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    Navigating,
    FormFilling,
    AwaitingResults,
    Extracting,
    Ranking,
    Exporting,
    Done,
    Failed,
}

impl RunStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStage::Done | RunStage::Failed)
    }

    /// 線性前進一步，或從任何非終止狀態進入 Failed
    pub fn can_transition_to(&self, next: RunStage) -> bool {
        use RunStage::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Idle, Navigating)
            | (Navigating, FormFilling)
            | (FormFilling, AwaitingResults)
            | (AwaitingResults, Extracting)
            | (Extracting, Ranking)
            | (Ranking, Exporting)
            | (Exporting, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Idle => "idle",
            RunStage::Navigating => "navigating",
            RunStage::FormFilling => "filling the search form",
            RunStage::AwaitingResults => "awaiting results",
            RunStage::Extracting => "extracting",
            RunStage::Ranking => "ranking",
            RunStage::Exporting => "exporting",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct StageTracker {
    current: RunStage,
    history: Vec<RunStage>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            current: RunStage::Idle,
            history: vec![RunStage::Idle],
        }
    }

    fn advance(&mut self, next: RunStage, monitor: &SystemMonitor) {
        debug_assert!(
            self.current.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.current,
            next
        );
        tracing::debug!("Run stage: {:?} → {:?}", self.current, next);
        monitor.log_stats(&self.current.to_string());
        self.current = next;
        self.history.push(next);
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub query: SearchQuery,
    pub layout: Layout,
    pub generated_at: DateTime<Utc>,
    pub extracted: usize,
    pub skipped: usize,
    /// 已排序並截斷的結果，rank 從 1 開始
    pub records: Vec<FlightRecord>,
    pub alerts: Vec<AlertRecord>,
    pub artifacts: Vec<Artifact>,
    pub export_failures: Vec<ScrapeError>,
    pub stages: Vec<RunStage>,
}

impl RunReport {
    pub fn final_stage(&self) -> RunStage {
        self.stages.last().copied().unwrap_or(RunStage::Idle)
    }
}

/// Parses a page snapshot and extracts offers of the detected layout.
///
/// Kept synchronous: `scraper::Html` must not live across an await point.
pub fn extract_page(
    html: &str,
    page_url: &str,
    layouts: &[LayoutSelectors],
) -> Result<(Layout, Extraction)> {
    let document = Html::parse_document(html);
    let layout = detect_layout(&document, layouts)?;
    let base_url = Url::parse(page_url).ok();
    let extraction = extract_records(&document, selectors_for(layout), base_url.as_ref())?;
    Ok((layout, extraction))
}

#[derive(Debug)]
pub struct SweepReport {
    pub query: SearchQuery,
    pub generated_at: DateTime<Utc>,
    pub months: Vec<MonthResult>,
    /// 所有月份的警示，依月份順序
    pub alerts: Vec<AlertRecord>,
    pub artifacts: Vec<Artifact>,
    pub export_failures: Vec<ScrapeError>,
}

impl SweepReport {
    pub fn best_month(&self) -> Option<&MonthResult> {
        best_month(&self.months)
    }

    pub fn searched_months(&self) -> usize {
        self.months.iter().filter(|m| m.error.is_none()).count()
    }
}

/// Drives one search from an empty browser page to exported artifacts.
pub struct Orchestrator<S: Storage> {
    settings: Settings,
    exporter: Exporter<S>,
    layouts: &'static [LayoutSelectors],
    monitor: SystemMonitor,
}

impl<S: Storage> Orchestrator<S> {
    pub fn new(settings: Settings, storage: S) -> Self {
        Self::new_with_monitoring(settings, storage, false)
    }

    pub fn new_with_monitoring(settings: Settings, storage: S, monitor_enabled: bool) -> Self {
        Self {
            settings,
            exporter: Exporter::new(storage),
            layouts: builtin_layouts(),
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs the search and always closes `browser` before returning.
    ///
    /// Fatal errors come back as [`ScrapeError::StageError`] naming the stage.
    pub async fn run<B: BrowserSession>(
        &self,
        mut browser: B,
        query: &SearchQuery,
    ) -> Result<RunReport> {
        tracing::info!("🚀 Starting flight search {}", query.route());

        let result = self.search(&mut browser, query, true).await;
        self.finish(&mut browser).await;
        result
    }

    /// Searches each of the `months` calendar months following the month of
    /// `from`, then exports the price calendar and the collected alerts.
    ///
    /// A failed month is recorded and skipped; only an invalid query or a lost
    /// browser session ends the sweep early.
    pub async fn sweep<B: BrowserSession>(
        &self,
        mut browser: B,
        query: &SearchQuery,
        from: NaiveDate,
        months: u32,
    ) -> Result<SweepReport> {
        tracing::info!("📅 Starting {}-month price sweep {}", months, query.route());

        if let Err(e) = query.validate() {
            self.finish(&mut browser).await;
            return Err(ScrapeError::at_stage(RunStage::Idle.to_string(), e));
        }

        let mut results = Vec::new();
        let mut alerts = Vec::new();
        for offset in 1..=months {
            let Some(period) = month_range(from, offset) else {
                break;
            };
            let label = period.start.format("%Y-%m");
            tracing::info!("Processing month {}/{}: {}", offset, months, label);

            let month_query = query.clone().with_dates(period.start, period.end);
            match self.search(&mut browser, &month_query, false).await {
                Ok(report) => {
                    let month = MonthResult::from_records(period, &report.records);
                    if let Some(stats) = month.stats {
                        tracing::info!("✓ {}: average {:.2} over {} offers", label, stats.average, stats.count);
                    }
                    alerts.extend(report.alerts);
                    results.push(month);
                }
                Err(e) => {
                    tracing::warn!("✗ {}: {}", label, e);
                    let session_lost =
                        matches!(e.root(), ScrapeError::WebDriverError { .. }) && !e.is_transient();
                    results.push(MonthResult::failed(period, e.to_string()));
                    if session_lost {
                        tracing::error!("❌ Browser session lost, stopping the sweep");
                        break;
                    }
                }
            }
        }
        self.finish(&mut browser).await;

        let generated_at = Utc::now();
        let mut outcome = self
            .exporter
            .export_sweep(&self.settings.formats, query, generated_at, &results)
            .await;
        let batch = ExportBatch {
            query,
            generated_at,
            records: &[],
        };
        self.export_alert_log(&batch, &alerts, &mut outcome).await;

        Ok(SweepReport {
            query: query.clone(),
            generated_at,
            months: results,
            alerts,
            artifacts: outcome.artifacts,
            export_failures: outcome.failures,
        })
    }

    async fn finish<B: BrowserSession>(&self, browser: &mut B) {
        if let Err(e) = browser.close().await {
            tracing::warn!("Failed to close browser session: {}", e);
        }
        self.monitor.log_final_stats();
    }

    /// One search on an open browser. With `export` unset the Exporting stage
    /// writes nothing; the sweep exports once at the end.
    async fn search<B: BrowserSession>(
        &self,
        browser: &mut B,
        query: &SearchQuery,
        export: bool,
    ) -> Result<RunReport> {
        // 參數錯誤在開啟任何頁面之前就拒絕
        if let Err(e) = query.validate() {
            return Err(ScrapeError::at_stage(RunStage::Idle.to_string(), e));
        }

        let mut tracker = StageTracker::new();
        match self.drive(browser, query, export, &mut tracker).await {
            Ok(report) => Ok(report),
            Err(e) => {
                let failed_at = tracker.current;
                if failed_at != RunStage::Navigating {
                    self.debug_screenshot(browser, &failed_at.to_string()).await;
                }
                tracker.advance(RunStage::Failed, &self.monitor);
                tracing::error!("❌ Run failed while {}: {}", failed_at, e);
                Err(ScrapeError::at_stage(failed_at.to_string(), e))
            }
        }
    }

    async fn drive<B: BrowserSession>(
        &self,
        browser: &mut B,
        query: &SearchQuery,
        export: bool,
        tracker: &mut StageTracker,
    ) -> Result<RunReport> {
        tracker.advance(RunStage::Navigating, &self.monitor);
        self.navigate(browser).await?;

        tracker.advance(RunStage::FormFilling, &self.monitor);
        self.fill_form(browser, query).await?;

        tracker.advance(RunStage::AwaitingResults, &self.monitor);
        self.wait_for_results(browser).await?;
        self.debug_screenshot(browser, "results").await;
        let html = browser.page_source().await?;
        let page_url = browser
            .current_url()
            .await
            .unwrap_or_else(|_| self.settings.base_url.clone());

        // 從這裡開始只會因版面辨識失敗
        tracker.advance(RunStage::Extracting, &self.monitor);
        let (layout, extraction) = extract_page(&html, &page_url, self.layouts)?;
        let extracted = extraction.records.len();

        tracker.advance(RunStage::Ranking, &self.monitor);
        let records = rank(extraction.records, self.settings.top_n);
        let alerts = evaluate_alerts(&records, self.settings.alert_threshold);
        tracing::info!(
            "🏁 Kept {} of {} offers, {} below {:.0}",
            records.len(),
            extracted,
            alerts.len(),
            self.settings.alert_threshold
        );

        tracker.advance(RunStage::Exporting, &self.monitor);
        let generated_at = Utc::now();
        let mut outcome = ExportOutcome::default();
        if export {
            let batch = ExportBatch {
                query,
                generated_at,
                records: &records,
            };
            outcome = self
                .exporter
                .export_all(&self.settings.formats, &batch)
                .await;
            self.export_alert_log(&batch, &alerts, &mut outcome).await;
        } else {
            tracing::debug!("Export deferred to the sweep summary");
        }

        tracker.advance(RunStage::Done, &self.monitor);
        tracing::info!("✅ Flight search completed");

        Ok(RunReport {
            query: query.clone(),
            layout,
            generated_at,
            extracted,
            skipped: extraction.skipped,
            records,
            alerts,
            artifacts: outcome.artifacts,
            export_failures: outcome.failures,
            stages: tracker.history.clone(),
        })
    }

    async fn export_alert_log(
        &self,
        batch: &ExportBatch<'_>,
        alerts: &[AlertRecord],
        outcome: &mut ExportOutcome,
    ) {
        match self
            .exporter
            .export_alerts(batch, alerts, self.settings.alert_threshold)
            .await
        {
            Ok(Some(artifact)) => outcome.artifacts.push(artifact),
            Ok(None) => {}
            Err(e) => {
                tracing::error!("❌ {}", e);
                outcome.failures.push(e);
            }
        }
    }

    async fn navigate<B: BrowserSession>(&self, browser: &mut B) -> Result<()> {
        let attempts = self.settings.retry_attempts.max(1);
        let url = &self.settings.base_url;
        let mut last_error = None;

        for attempt in 1..=attempts {
            tracing::info!("🌐 Navigating to {} (attempt {}/{})", url, attempt, attempts);
            match browser.goto(url).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < attempts => {
                    tracing::warn!("Navigation attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                    tokio::time::sleep(self.settings.timeouts.retry_delay).await;
                }
                Err(e) => {
                    last_error = Some(e);
                    break;
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        Err(ScrapeError::navigation(
            RunStage::Navigating.to_string(),
            format!("{} unreachable: {}", url, message),
        ))
    }

    /// Each form action is retried on its own, so steppers and the submit
    /// button are never clicked twice.
    async fn fill_form<B: BrowserSession>(&self, browser: &mut B, query: &SearchQuery) -> Result<()> {
        let attempts = self.settings.retry_attempts.max(1);
        let settle = self.settings.timeouts.short_wait;

        for action in form_actions(&self.settings.form, query) {
            let mut attempt = 1;
            loop {
                match perform(browser, &action, settle).await {
                    Ok(()) => break,
                    Err(e) if e.is_transient() && attempt < attempts => {
                        tracing::warn!(
                            "Form step '{}' failed (attempt {}/{}): {}",
                            action,
                            attempt,
                            attempts,
                            e
                        );
                        self.dismiss_popups(browser).await;
                        tokio::time::sleep(self.settings.timeouts.retry_delay).await;
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        tracing::debug!("Submitted search {}", query.route());
        Ok(())
    }

    /// 關掉 cookie 橫幅之類會攔截點擊的視窗
    async fn dismiss_popups<B: BrowserSession>(&self, browser: &mut B) {
        for selector in &self.settings.popup_selectors {
            if matches!(browser.is_present(selector).await, Ok(true)) {
                match browser.click(selector).await {
                    Ok(()) => tracing::debug!("Dismissed popup {}", selector),
                    Err(e) => tracing::debug!("Could not dismiss popup {}: {}", selector, e),
                }
            }
        }
    }

    /// Polls for any layout marker. A driver error that is not transient ends
    /// the wait at once; if the last polls only produced transient errors, the
    /// timeout reports that error instead of a bare timeout.
    async fn wait_for_results<B: BrowserSession>(&self, browser: &mut B) -> Result<()> {
        let timeout = self.settings.timeouts.results;
        let poll_interval = self.settings.timeouts.poll_interval;
        let markers: Vec<&str> = self
            .layouts
            .iter()
            .filter_map(|layout| layout.markers.first().copied())
            .collect();

        tracing::info!("⏳ Waiting up to {:?} for results", timeout);
        let mut last_error: Option<ScrapeError> = None;
        let poll = async {
            loop {
                for marker in &markers {
                    match browser.is_present(marker).await {
                        Ok(true) => return Ok(()),
                        Ok(false) => last_error = None,
                        Err(e) if e.is_transient() => {
                            tracing::debug!("Results poll failed: {}", e);
                            last_error = Some(e);
                        }
                        Err(e) => return Err(e),
                    }
                }
                tokio::time::sleep(poll_interval).await;
            }
        };
        let outcome = tokio::time::timeout(timeout, poll).await;

        match outcome {
            Ok(result) => result?,
            Err(_) => {
                return Err(last_error.unwrap_or(ScrapeError::TimeoutError {
                    stage: RunStage::AwaitingResults.to_string(),
                    waited_ms: timeout.as_millis() as u64,
                }));
            }
        }

        // 結果容器出現後再給頁面一點時間把卡片渲染完
        tokio::time::sleep(self.settings.timeouts.short_wait).await;
        Ok(())
    }

    async fn debug_screenshot<B: BrowserSession>(&self, browser: &mut B, stage: &str) {
        if !self.settings.debug_screenshots {
            return;
        }

        let png = match browser.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                tracing::warn!("Could not take debug screenshot: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .exporter
            .save_screenshot(stage, Utc::now(), &png)
            .await
        {
            tracing::warn!("Could not save debug screenshot: {}", e);
        }
    }
}
