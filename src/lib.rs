pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{BrowserOptions, LocalStorage, WebDriverSession};
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{Settings, TomlConfig};
pub use core::engine::{Orchestrator, RunReport, RunStage, SweepReport};
pub use utils::error::{Result, ScrapeError};
