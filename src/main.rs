use anyhow::Context;
use clap::Parser;
use flight_scout::core::layout::builtin_layouts;
use flight_scout::core::summary::{render_summary, render_sweep_summary};
use flight_scout::utils::error::{ErrorSeverity, ScrapeError};
use flight_scout::utils::{logger, validation::Validate};
use flight_scout::{
    BrowserOptions, CliConfig, LocalStorage, Orchestrator, Settings, TomlConfig, WebDriverSession,
};

fn exit_with(e: &ScrapeError) -> ! {
    tracing::error!(
        "❌ Flight search failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,    // 逾時或輸出失敗，可重試
        ErrorSeverity::Critical => 3,  // 系統錯誤
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 不存在時忽略
    dotenvy::dotenv().ok();

    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting flight-scout CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = cli.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }

    let file_config = match &cli.config {
        Some(path) => {
            tracing::info!("📋 Loading configuration from {}", path);
            let config = TomlConfig::from_file(path)
                .with_context(|| format!("failed to load config file {}", path))?;
            if let Err(e) = config.validate() {
                tracing::error!("❌ Configuration file validation failed: {}", e);
                exit_with(&e);
            }
            Some(config)
        }
        None => None,
    };

    let mut settings = match Settings::from_env(file_config.as_ref()) {
        Ok(settings) => settings,
        Err(e) => exit_with(&e),
    };
    if let Some(top) = cli.top {
        settings.top_n = top;
    }
    if !cli.formats.is_empty() {
        settings.formats = cli.formats.clone();
    }

    let query = cli.to_query();
    let endpoint = match settings.browser_endpoint(cli.proxy) {
        Ok(endpoint) => endpoint.to_string(),
        Err(e) => exit_with(&e),
    };

    if cli.dry_run {
        let formats: Vec<String> = settings.formats.iter().map(|f| f.to_string()).collect();
        println!("🔎 Dry run: {}", query.route());
        if let Some(months) = cli.months {
            println!("   Price calendar over the next {} month(s)", months);
        }
        println!("   Browser endpoint: {}", endpoint);
        println!("   Search site: {}", settings.base_url);
        println!("   Keep top {} offers, alert below {:.0}", settings.top_n, settings.alert_threshold);
        println!("   Formats: {} → {}", formats.join(", "), cli.output_path);
        let layouts: Vec<String> = builtin_layouts().iter().map(|l| l.layout.to_string()).collect();
        println!("   Known layouts: {}", layouts.join(", "));
        return Ok(());
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let options = BrowserOptions {
        endpoint,
        headless: cli.headless,
        browser_name: settings.browser_name.clone(),
        page_load_timeout: settings.timeouts.page_load,
        ..BrowserOptions::default()
    };
    let browser = match WebDriverSession::connect(&options).await {
        Ok(browser) => browser,
        Err(e) => exit_with(&ScrapeError::at_stage("connecting to the browser", e)),
    };

    let storage = LocalStorage::new(cli.output_path.clone());
    let orchestrator = Orchestrator::new_with_monitoring(settings, storage, cli.monitor);

    if let Some(months) = cli.months {
        let today = chrono::Local::now().date_naive();
        match orchestrator.sweep(browser, &query, today, months).await {
            Ok(report) => {
                println!(
                    "{}",
                    render_sweep_summary(
                        &report.query,
                        &report.months,
                        &report.alerts,
                        orchestrator.settings().alert_threshold
                    )
                );
                for artifact in &report.artifacts {
                    println!("📁 {}: {}", artifact.label, artifact.location);
                }
                for failure in &report.export_failures {
                    eprintln!("❌ {}", failure);
                }

                // 每個月都失敗就當成整體失敗
                if report.searched_months() == 0 {
                    std::process::exit(1);
                }
                if !report.export_failures.is_empty() {
                    std::process::exit(2);
                }
            }
            Err(e) => exit_with(&e),
        }
        return Ok(());
    }

    match orchestrator.run(browser, &query).await {
        Ok(report) => {
            println!(
                "{}",
                render_summary(
                    &report.query,
                    &report.records,
                    &report.alerts,
                    orchestrator.settings().alert_threshold
                )
            );

            for artifact in &report.artifacts {
                println!("📁 {}: {}", artifact.label, artifact.location);
            }
            if report.skipped > 0 {
                println!("⚠️  {} offer(s) skipped during extraction", report.skipped);
            }
            for failure in &report.export_failures {
                eprintln!("❌ {}", failure);
            }

            if !report.export_failures.is_empty() {
                std::process::exit(2);
            }
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}
