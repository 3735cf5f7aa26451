use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{info, warn};

use common::config::Settings;
use common::logger;
use market_data::remote::{IndexTableSource, YahooClient};
use market_data::{HistoryFetcher, SeedSource, UniverseBuilder};
use strategy::BreakoutDetector;

use crate::services::alert_dispatcher::AlertDispatcher;
use crate::services::annotator::{Annotator, DisabledGenerator};
use crate::services::gemini_service::GeminiClient;
use crate::services::scan_job::ScanJob;
use crate::services::telegram_service::TelegramService;
use crate::traits::TextGenerator;

mod services;
mod traits;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logger::setup_logger();

    let settings = Settings::from_env().context("Refusing to start without a valid configuration")?;
    info!(
        "Breakout scan starting: trend={} threshold={} min_bars={}",
        settings.detector.trend, settings.detector.rel_volume_threshold, settings.detector.min_bars
    );

    let call_timeout = settings.throttle.call_timeout;

    let mut universe_builder = UniverseBuilder::new()
        .with_source(SeedSource::new("seeds", settings.universe.seeds.clone()));
    if settings.universe.scrape_enabled {
        for source in settings.universe.index_sources.iter().cloned() {
            let name = source.name.clone();
            universe_builder = universe_builder
                .with_source_or_skip(&name, IndexTableSource::new(source, call_timeout));
        }
    }

    let detector = BreakoutDetector::new(settings.detector.clone());
    let provider = YahooClient::new(&settings.market_data, call_timeout)
        .context("Failed to build HTTP client for market data")?;
    let fetcher = HistoryFetcher::new(
        Arc::new(provider),
        &settings.throttle,
        settings.market_data.lookback_days,
        detector.required_bars(),
    );

    let generator: Arc<dyn TextGenerator> = match &settings.gemini {
        Some(gemini) => Arc::new(
            GeminiClient::new(gemini, call_timeout)
                .context("Failed to build HTTP client for text generation")?,
        ),
        None => {
            warn!("GEMINI_API_KEY is not set. Alerts will carry fallback text.");
            Arc::new(DisabledGenerator)
        }
    };

    let job = ScanJob::new(
        fetcher,
        detector,
        Annotator::new(generator, call_timeout),
        AlertDispatcher::new(Arc::new(TelegramService::new(&settings.telegram)), call_timeout),
        settings.throttle.alert_concurrency,
    );

    let universe = universe_builder.build().await;
    let report = job.run(&universe).await;

    info!(
        "Scan complete: {} scanned, {} failed, {} signals",
        report.scanned_count, report.failed_count, report.signal_count
    );
    Ok(())
}
