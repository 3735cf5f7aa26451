use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Ticker;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
}

/// Daily bars for one ticker, oldest first.
///
/// Dates are strictly increasing. The series can be shorter than the window
/// that was asked for (illiquid or delisted symbols), so callers check
/// [`HistorySeries::len`] before deriving statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    ticker: Ticker,
    bars: Vec<Bar>,
}

impl HistorySeries {
    /// Sorts by date, keeps the last bar seen for a repeated date and drops
    /// bars whose close is not a positive finite number.
    pub fn new(ticker: Ticker, mut bars: Vec<Bar>) -> Self {
        bars.retain(|bar| bar.close.is_finite() && bar.close > 0.0);
        bars.sort_by_key(|bar| bar.date);

        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }

        Self {
            ticker,
            bars: deduped,
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.bars.iter().map(|bar| bar.close)
    }

    pub fn volumes(&self) -> impl Iterator<Item = u64> + '_ {
        self.bars.iter().map(|bar| bar.volume)
    }
}
