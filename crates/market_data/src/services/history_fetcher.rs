use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use common::config::ThrottleSettings;
use common::error::FetchError;
use common::models::{HistorySeries, Ticker};
use futures_util::{StreamExt, stream};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::traits::MarketDataProvider;

/// Wraps a [`MarketDataProvider`] so that every ticker is fetched in
/// isolation: bounded in time, retried once when the provider answers with
/// nothing, and checked against the minimum bar count.
///
/// Concurrency is bounded by [`HistoryFetcher::fetch_all`]; a direct call to
/// [`HistoryFetcher::fetch`] only waits out the request delay.
pub struct HistoryFetcher {
    provider: Arc<dyn MarketDataProvider>,
    concurrency: usize,
    lookback_days: u32,
    min_bars: usize,
    request_delay: Duration,
    retry_delay: Duration,
    call_timeout: Duration,
}

impl HistoryFetcher {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        throttle: &ThrottleSettings,
        lookback_days: u32,
        min_bars: usize,
    ) -> Self {
        Self {
            provider,
            concurrency: throttle.fetch_concurrency.max(1),
            lookback_days,
            min_bars,
            request_delay: throttle.request_delay,
            retry_delay: throttle.retry_delay,
            call_timeout: throttle.call_timeout,
        }
    }

    pub async fn fetch(&self, ticker: &Ticker) -> Result<HistorySeries, FetchError> {
        if !self.request_delay.is_zero() {
            sleep(self.request_delay).await;
        }

        let series = match self.request(ticker).await {
            Err(FetchError::Empty) => {
                debug!("{}: empty response, retrying in {:?}", ticker, self.retry_delay);
                sleep(self.retry_delay).await;
                self.request(ticker).await?
            }
            other => other?,
        };

        if series.len() < self.min_bars {
            return Err(FetchError::InsufficientHistory {
                have: series.len(),
                need: self.min_bars,
            });
        }

        Ok(series)
    }

    /// One outcome per ticker, in completion order, with at most
    /// `fetch_concurrency` requests in flight.
    pub async fn fetch_all(
        &self,
        tickers: &BTreeSet<Ticker>,
    ) -> Vec<(Ticker, Result<HistorySeries, FetchError>)> {
        stream::iter(tickers.iter().cloned())
            .map(|ticker| async move {
                let outcome = self.fetch(&ticker).await;
                if let Err(e) = &outcome {
                    warn!("{}: {}", ticker, e);
                }
                (ticker, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    async fn request(&self, ticker: &Ticker) -> Result<HistorySeries, FetchError> {
        timeout(self.call_timeout, self.provider.history(ticker, self.lookback_days))
            .await
            .map_err(|_| FetchError::Timeout(self.call_timeout))?
    }
}
