pub mod remote;
pub mod services;
pub mod traits;

pub use services::history_fetcher::HistoryFetcher;
pub use services::universe_builder::{SeedSource, UniverseBuilder};
pub use traits::{MarketDataProvider, UniverseSource};
