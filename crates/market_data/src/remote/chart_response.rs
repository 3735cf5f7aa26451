use chrono::DateTime;
use common::error::FetchError;
use common::models::{Bar, HistorySeries, Ticker};
use serde::Deserialize;

use crate::traits::RemoteResponse;

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub chart: ChartBody,
}

#[derive(Debug, Deserialize)]
pub struct ChartBody {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub meta: Option<ChartMeta>,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct ChartMeta {
    #[serde(rename(deserialize = "gmtoffset"))]
    pub gmt_offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
}

// Yahoo leaves holes as `null` on days without trading.
#[derive(Debug, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<u64>>,
}

impl RemoteResponse<HistorySeries> for ChartEnvelope {
    fn to_model(&self, ticker: &Ticker) -> Result<HistorySeries, FetchError> {
        if let Some(error) = &self.chart.error {
            let detail = error.description.as_deref().unwrap_or(&error.code);
            return Err(FetchError::Provider(detail.to_string()));
        }

        let result = self
            .chart
            .result
            .as_ref()
            .and_then(|results| results.first())
            .ok_or(FetchError::Empty)?;
        let Some(quote) = result.indicators.quote.first() else {
            return Err(FetchError::Empty);
        };

        let rows = result.timestamp.len();
        if quote.close.len() != rows || quote.volume.len() != rows {
            return Err(FetchError::Malformed(format!(
                "{} timestamps, {} closes, {} volumes",
                rows,
                quote.close.len(),
                quote.volume.len()
            )));
        }

        let offset = result.meta.as_ref().and_then(|m| m.gmt_offset).unwrap_or(0);
        let bars: Vec<Bar> = result
            .timestamp
            .iter()
            .zip(&quote.close)
            .zip(&quote.volume)
            .filter_map(|((&ts, &close), &volume)| {
                let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
                Some(Bar {
                    date,
                    close: close?,
                    volume: volume?,
                })
            })
            .collect();

        if bars.is_empty() {
            return Err(FetchError::Empty);
        }

        Ok(HistorySeries::new(ticker.clone(), bars))
    }
}
