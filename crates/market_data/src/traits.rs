use std::collections::BTreeSet;

use async_trait::async_trait;
use common::error::{FetchError, UniverseError};
use common::models::{HistorySeries, Ticker};

/// Converts a provider payload into a domain model for the requested ticker.
pub trait RemoteResponse<T> {
    fn to_model(&self, ticker: &Ticker) -> Result<T, FetchError>;
}

/// Daily close/volume history for one symbol.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn history(&self, ticker: &Ticker, lookback_days: u32) -> Result<HistorySeries, FetchError>;
}

/// One contributor to the scan universe. Failures are reported, the builder
/// decides what to do with them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UniverseSource: Send + Sync {
    fn name(&self) -> String;

    async fn try_fetch_symbols(&self) -> Result<BTreeSet<Ticker>, UniverseError>;
}
