pub mod alert;
pub mod engine;
pub mod export;
pub mod extract;
pub mod form;
pub mod layout;
pub mod normalize;
pub mod rank;
pub mod summary;
pub mod sweep;

pub use crate::domain::model::{AlertRecord, FlightRecord, SearchQuery};
pub use crate::domain::ports::{BrowserSession, Storage};
pub use crate::utils::error::Result;
