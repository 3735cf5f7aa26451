use common::config::DetectorSettings;
use common::models::{HistorySeries, Signal, TrendKind};
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage};
use tracing::debug;

/// Volume-and-trend breakout classifier.
///
/// Stateless: indicators are rebuilt for every series, so one detector can be
/// shared across any number of concurrent classifications.
#[derive(Debug, Clone)]
pub struct BreakoutDetector {
    settings: DetectorSettings,
}

impl BreakoutDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn required_bars(&self) -> usize {
        self.settings.required_bars()
    }

    /// Returns a signal iff relative volume exceeds the threshold and the
    /// last close is above the trend reference. Anything undefined along the
    /// way (short series, zero average volume, non-finite values) is a
    /// quiet `None`.
    pub fn classify(&self, series: &HistorySeries) -> Option<Signal> {
        let ticker = series.ticker();
        let need = self.required_bars();
        if series.len() < need {
            debug!("{}: {} bars, need {}. Skipping.", ticker, series.len(), need);
            return None;
        }

        let last = series.last()?;
        let last_close = last.close;

        let avg_volume = last_output(
            SimpleMovingAverage::new(self.settings.volume_window).ok()?,
            series.volumes().map(|v| v as f64),
        )?;
        if !(avg_volume.is_finite() && avg_volume > 0.0) {
            debug!("{}: average volume is {}. Skipping.", ticker, avg_volume);
            return None;
        }

        let relative_volume = last.volume as f64 / avg_volume;
        let trend_reference = self.trend_reference(series)?;
        if !(relative_volume.is_finite() && trend_reference.is_finite()) {
            return None;
        }

        let rsl = match self.settings.rsl {
            Some(filter) => {
                let sma = last_output(SimpleMovingAverage::new(filter.window).ok()?, series.closes())?;
                let rsl = last_close / sma;
                if !rsl.is_finite() {
                    return None;
                }
                Some((rsl, filter.min_rsl))
            }
            None => None,
        };

        let volume_ok = relative_volume > self.settings.rel_volume_threshold;
        let trend_ok = last_close > trend_reference;
        let rsl_ok = rsl.is_none_or(|(rsl, min_rsl)| rsl > min_rsl);

        debug!(
            "{}: close={:.2} rel_vol={:.2} {}={:.2} rsl={:?} -> volume_ok={} trend_ok={} rsl_ok={}",
            ticker,
            last_close,
            relative_volume,
            self.settings.trend,
            trend_reference,
            rsl.map(|(rsl, _)| rsl),
            volume_ok,
            trend_ok,
            rsl_ok
        );

        if !(volume_ok && trend_ok && rsl_ok) {
            return None;
        }

        Some(Signal {
            ticker: ticker.clone(),
            last_close,
            relative_volume,
            trend_reference,
            trend_kind: self.settings.trend,
            rsl: rsl.map(|(rsl, _)| rsl),
        })
    }

    fn trend_reference(&self, series: &HistorySeries) -> Option<f64> {
        match self.settings.trend {
            TrendKind::Sma(window) => {
                last_output(SimpleMovingAverage::new(window).ok()?, series.closes())
            }
            TrendKind::Ema(window) => {
                last_output(ExponentialMovingAverage::new(window).ok()?, series.closes())
            }
        }
    }
}

/// Feeds every value through the indicator and keeps the final output.
fn last_output<I>(mut indicator: I, values: impl Iterator<Item = f64>) -> Option<f64>
where
    I: Next<f64, Output = f64>,
{
    values.fold(None, |_, value| Some(indicator.next(value)))
}
