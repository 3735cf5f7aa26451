use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Counters for one scan invocation.
///
/// Every scanned ticker lands in exactly one of the failed, signal or
/// no-signal buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub scanned_count: usize,
    pub failed_count: usize,
    pub signal_count: usize,
    pub no_signal_count: usize,
    pub annotation_fallbacks: usize,
    pub delivery_failures: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            scanned_count: 0,
            failed_count: 0,
            signal_count: 0,
            no_signal_count: 0,
            annotation_fallbacks: 0,
            delivery_failures: 0,
        }
    }

    pub fn record_failed(&mut self) {
        self.scanned_count += 1;
        self.failed_count += 1;
    }

    pub fn record_signal(&mut self) {
        self.scanned_count += 1;
        self.signal_count += 1;
    }

    pub fn record_no_signal(&mut self) {
        self.scanned_count += 1;
        self.no_signal_count += 1;
    }

    pub fn record_annotation_fallback(&mut self) {
        self.annotation_fallbacks += 1;
    }

    pub fn record_delivery_failure(&mut self) {
        self.delivery_failures += 1;
    }

    pub fn is_balanced(&self) -> bool {
        self.scanned_count == self.signal_count + self.failed_count + self.no_signal_count
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
