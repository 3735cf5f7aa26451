use std::fmt;

use serde::{Deserialize, Serialize};

use super::Ticker;

/// Which moving average a breakout has to clear.
///
/// The two kinds differ in sensitivity: a 50-bar SMA reacts faster than a
/// 200-bar EMA, so one deployment should stick to one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendKind {
    Sma(usize),
    Ema(usize),
}

impl TrendKind {
    pub fn window(&self) -> usize {
        match self {
            Self::Sma(window) | Self::Ema(window) => *window,
        }
    }
}

impl fmt::Display for TrendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sma(window) => write!(f, "SMA{window}"),
            Self::Ema(window) => write!(f, "EMA{window}"),
        }
    }
}

/// A detected breakout. Produced by the detector and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub ticker: Ticker,
    pub last_close: f64,
    pub relative_volume: f64,
    pub trend_reference: f64,
    pub trend_kind: TrendKind,
    /// Close divided by an n-bar SMA, only set when the RSL filter is on.
    pub rsl: Option<f64>,
}
