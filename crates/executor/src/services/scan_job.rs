use std::collections::BTreeSet;

use common::models::{RunReport, Ticker};
use futures_util::{StreamExt, stream};
use market_data::HistoryFetcher;
use strategy::BreakoutDetector;
use tracing::{debug, info};

use crate::services::alert_dispatcher::AlertDispatcher;
use crate::services::annotator::Annotator;

/// One scan invocation: fetch, classify, annotate, alert, summarize.
pub struct ScanJob {
    fetcher: HistoryFetcher,
    detector: BreakoutDetector,
    annotator: Annotator,
    dispatcher: AlertDispatcher,
    alert_concurrency: usize,
}

impl ScanJob {
    pub fn new(
        fetcher: HistoryFetcher,
        detector: BreakoutDetector,
        annotator: Annotator,
        dispatcher: AlertDispatcher,
        alert_concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            detector,
            annotator,
            dispatcher,
            alert_concurrency: alert_concurrency.max(1),
        }
    }

    /// Per-ticker and per-message failures end up in the report, never in
    /// the return type. The summary is sent even for an empty universe.
    pub async fn run(&self, universe: &BTreeSet<Ticker>) -> RunReport {
        let mut report = RunReport::new();
        info!("Run {}: scanning {} symbols", report.run_id, universe.len());

        let mut signals = Vec::new();
        for (ticker, outcome) in self.fetcher.fetch_all(universe).await {
            let Ok(series) = outcome else {
                report.record_failed();
                continue;
            };

            match self.detector.classify(&series) {
                Some(signal) => {
                    info!(
                        "BREAKOUT {}: close={:.2} rel_vol={:.2}x {}={:.2}",
                        signal.ticker,
                        signal.last_close,
                        signal.relative_volume,
                        signal.trend_kind,
                        signal.trend_reference
                    );
                    report.record_signal();
                    signals.push(signal);
                }
                None => {
                    debug!("{}: no breakout", ticker);
                    report.record_no_signal();
                }
            }
        }
        signals.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        let deliveries: Vec<(bool, bool)> = stream::iter(signals)
            .map(|signal| async move {
                let annotation = self.annotator.annotate(signal.clone()).await;
                let delivered = self.dispatcher.send_signal(&signal, &annotation).await.is_ok();
                (annotation.is_fallback(), delivered)
            })
            .buffered(self.alert_concurrency)
            .collect()
            .await;

        for (fallback, delivered) in deliveries {
            if fallback {
                report.record_annotation_fallback();
            }
            if !delivered {
                report.record_delivery_failure();
            }
        }

        if self.dispatcher.send_summary(&report).await.is_err() {
            report.record_delivery_failure();
        }

        info!(
            "Run {} done: scanned={} failed={} signals={} quiet={} undelivered={}",
            report.run_id,
            report.scanned_count,
            report.failed_count,
            report.signal_count,
            report.no_signal_count,
            report.delivery_failures
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{Days, NaiveDate};
    use common::config::{DetectorSettings, ThrottleSettings};
    use common::error::{AnnotationError, DeliveryError, FetchError};
    use common::models::annotation::FALLBACK_RATIONALE;
    use common::models::{Bar, HistorySeries};
    use market_data::MarketDataProvider;

    use crate::traits::{ChatTransport, MockTextGenerator};

    /// Canned histories keyed by symbol; unknown symbols fail.
    struct FakeProvider(HashMap<String, HistorySeries>);

    #[async_trait]
    impl MarketDataProvider for FakeProvider {
        async fn history(&self, ticker: &Ticker, _: u32) -> Result<HistorySeries, FetchError> {
            self.0
                .get(ticker.as_str())
                .cloned()
                .ok_or(FetchError::Status(404))
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingTransport {
        fn messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send(&self, text: &str) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(DeliveryError::Transport("403 Forbidden".to_string()));
            }
            Ok(())
        }
    }

    fn ticker(symbol: &str) -> Ticker {
        Ticker::parse(symbol).unwrap()
    }

    /// `len` bars ending in `last_close`, closes averaging 100 over the last
    /// 50 bars, volumes quiet nineteen times then `spike`.
    fn history(symbol: &str, len: usize, last_close: f64, quiet: u64, spike: u64) -> HistorySeries {
        let start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let head = (100.0 * 50.0 - last_close) / 49.0;
        let bars = (0..len)
            .map(|i| Bar {
                date: start.checked_add_days(Days::new(i as u64)).unwrap(),
                close: if i + 1 == len { last_close } else { head },
                volume: if i + 1 == len { spike } else { quiet },
            })
            .collect();
        HistorySeries::new(ticker(symbol), bars)
    }

    fn job(
        histories: Vec<HistorySeries>,
        generator: MockTextGenerator,
        transport: Arc<RecordingTransport>,
    ) -> ScanJob {
        let provider = FakeProvider(
            histories
                .into_iter()
                .map(|h| (h.ticker().as_str().to_string(), h))
                .collect(),
        );
        let throttle = ThrottleSettings {
            request_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            call_timeout: Duration::from_millis(200),
            ..ThrottleSettings::default()
        };
        let detector = BreakoutDetector::new(DetectorSettings::default());
        let fetcher = HistoryFetcher::new(Arc::new(provider), &throttle, 400, detector.required_bars());

        ScanJob::new(
            fetcher,
            detector,
            Annotator::new(Arc::new(generator), throttle.call_timeout),
            AlertDispatcher::new(transport, throttle.call_timeout),
            throttle.alert_concurrency,
        )
    }

    fn failing_generator() -> MockTextGenerator {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_complete()
            .returning(|_| Err(AnnotationError::Status { status: 429, body: "quota".to_string() }));
        generator
    }

    #[tokio::test]
    async fn mixed_universe_yields_one_alert_and_one_summary() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_complete()
            .times(1)
            .returning(|_| Ok("Approval news lifted the shares.".to_string()));
        let transport = Arc::new(RecordingTransport::default());

        let job = job(
            vec![
                history("A", 10, 110.0, 1_150, 1_900),
                history("B", 60, 110.0, 1_150, 1_900),
                history("C", 60, 110.0, 945, 1_045),
            ],
            generator,
            transport.clone(),
        );
        let universe = ["A", "B", "C"].into_iter().map(ticker).collect();
        let report = job.run(&universe).await;

        assert_eq!(report.scanned_count, 3);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.signal_count, 1);
        assert_eq!(report.no_signal_count, 1);
        assert!(report.is_balanced());

        let messages = transport.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("SIGNAL: B"));
        assert!(messages[0].contains("Volume: 1.60x"));
        assert!(messages[0].contains("Approval news lifted the shares."));
        assert!(messages[1].contains("Scanned: 3 | Failed: 1 | Signals: 1"));
    }

    #[tokio::test]
    async fn failing_generator_still_alerts_every_signal() {
        let transport = Arc::new(RecordingTransport::default());
        let job = job(
            vec![
                history("X1", 60, 110.0, 900, 1_900),
                history("X2", 60, 120.0, 900, 1_900),
                history("X3", 60, 105.0, 900, 1_900),
            ],
            failing_generator(),
            transport.clone(),
        );
        let universe = ["X1", "X2", "X3"].into_iter().map(ticker).collect();
        let report = job.run(&universe).await;

        assert_eq!(report.signal_count, 3);
        assert_eq!(report.annotation_fallbacks, 3);

        let messages = transport.messages();
        assert_eq!(messages.len(), 4);
        for message in &messages[..3] {
            assert!(message.contains(FALLBACK_RATIONALE));
        }
        assert!(messages[3].contains("Alerts without commentary: 3"));
    }

    #[tokio::test]
    async fn undeliverable_messages_do_not_stop_the_run() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..RecordingTransport::default()
        });
        let job = job(
            vec![
                history("X1", 60, 110.0, 900, 1_900),
                history("X2", 60, 120.0, 900, 1_900),
            ],
            failing_generator(),
            transport.clone(),
        );
        let universe = ["X1", "X2", "UNKNOWN"].into_iter().map(ticker).collect();
        let report = job.run(&universe).await;

        assert_eq!(transport.messages().len(), 3);
        assert_eq!(report.delivery_failures, 3);
        assert_eq!(report.failed_count, 1);
        assert!(report.is_balanced());
    }

    #[tokio::test]
    async fn empty_universe_still_sends_the_heartbeat() {
        let transport = Arc::new(RecordingTransport::default());
        let job = job(Vec::new(), MockTextGenerator::new(), transport.clone());
        let report = job.run(&BTreeSet::new()).await;

        assert_eq!(report.scanned_count, 0);
        let messages = transport.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Scanned: 0 | Failed: 0 | Signals: 0"));
    }
}
