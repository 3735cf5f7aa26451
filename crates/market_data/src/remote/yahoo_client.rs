use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use common::config::MarketDataSettings;
use common::error::FetchError;
use common::models::{HistorySeries, Ticker};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::remote::chart_response::ChartEnvelope;
use crate::traits::{MarketDataProvider, RemoteResponse};

/// Daily bars from the Yahoo Finance v8 chart endpoint. No credentials.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(settings: &MarketDataSettings, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; breakout-scanner/0.1)")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn history(&self, ticker: &Ticker, lookback_days: u32) -> Result<HistorySeries, FetchError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let period2 = Utc::now();
        let period1 = period2 - ChronoDuration::days(i64::from(lookback_days));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.timestamp().to_string()),
                ("period2", period2.timestamp().to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        debug!("GET {} -> {}", url, status);

        // Unknown symbols answer 404 with an envelope that carries the reason.
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        match serde_json::from_str::<ChartEnvelope>(&body) {
            Ok(envelope) => envelope.to_model(ticker),
            Err(_) if status == StatusCode::OK => {
                Err(FetchError::Malformed("chart payload did not parse".to_string()))
            }
            Err(_) => Err(FetchError::Status(status.as_u16())),
        }
    }
}
