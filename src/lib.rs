pub mod accumulator;
pub mod config;
pub mod extractor;
pub mod filters;
pub mod models;
pub mod navigator;
pub mod paginator;
pub mod retry;
pub mod runner;
pub mod screenshots;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use accumulator::BidSheet;
pub use models::{BidRecord, DateWindow, ScrapeRequest, SENTINEL};
pub use runner::ScrapeRunner;
pub use utils::error::{ScrapeError, ScrapePhase};

pub type Result<T> = std::result::Result<T, ScrapeError>;
