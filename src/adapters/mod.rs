// Adapters layer: concrete implementations of the domain ports.

pub mod storage;
pub mod webdriver;

pub use storage::LocalStorage;
pub use webdriver::{BrowserOptions, WebDriverSession};
