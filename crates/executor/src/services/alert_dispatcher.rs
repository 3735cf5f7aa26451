use std::sync::Arc;
use std::time::Duration;

use common::error::DeliveryError;
use common::models::{Annotation, RunReport, Signal};
use tokio::time::timeout;
use tracing::{error, info};

use crate::traits::ChatTransport;

pub struct AlertDispatcher {
    transport: Arc<dyn ChatTransport>,
    call_timeout: Duration,
}

impl AlertDispatcher {
    pub fn new(transport: Arc<dyn ChatTransport>, call_timeout: Duration) -> Self {
        Self {
            transport,
            call_timeout,
        }
    }

    pub async fn send_signal(
        &self,
        signal: &Signal,
        annotation: &Annotation,
    ) -> Result<(), DeliveryError> {
        self.deliver(&format_signal(signal, annotation)).await?;
        info!("Alert sent for {}", signal.ticker);
        Ok(())
    }

    pub async fn send_summary(&self, report: &RunReport) -> Result<(), DeliveryError> {
        self.deliver(&format_summary(report)).await?;
        info!("Run summary sent");
        Ok(())
    }

    async fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        let result = match timeout(self.call_timeout, self.transport.send(text)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.call_timeout)),
        };

        if let Err(e) = &result {
            error!("Failed to deliver message: {}", e);
        }
        result
    }
}

pub fn format_signal(signal: &Signal, annotation: &Annotation) -> String {
    let mut message = format!(
        "🚀 SIGNAL: {}\n💰 Price: {:.2}\n📊 Volume: {:.2}x average\n📈 Above {}: {:.2}",
        signal.ticker,
        signal.last_close,
        signal.relative_volume,
        signal.trend_kind,
        signal.trend_reference
    );
    if let Some(rsl) = signal.rsl {
        message.push_str(&format!("\n💪 RSL: {rsl:.3}"));
    }

    let label = if annotation.is_fallback() { "📝 Note" } else { "🧠 AI" };
    message.push_str(&format!("\n{}: {}", label, annotation.rationale_text));
    message
}

pub fn format_summary(report: &RunReport) -> String {
    let mut message = format!(
        "🔔 Scan finished {}\nScanned: {} | Failed: {} | Signals: {}",
        report.timestamp.format("%Y-%m-%d %H:%M UTC"),
        report.scanned_count,
        report.failed_count,
        report.signal_count
    );
    if report.signal_count == 0 {
        message.push_str("\n😴 No breakouts today.");
    }
    if report.annotation_fallbacks > 0 {
        message.push_str(&format!(
            "\nAlerts without commentary: {}",
            report.annotation_fallbacks
        ));
    }
    if report.delivery_failures > 0 {
        message.push_str(&format!("\nUndelivered alerts: {}", report.delivery_failures));
    }
    message
}
