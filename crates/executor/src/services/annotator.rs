use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::error::AnnotationError;
use common::models::{Annotation, Signal};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::traits::TextGenerator;

const MAX_PROMPT_CHARS: usize = 600;
const MAX_RATIONALE_CHARS: usize = 400;

/// Stands in for the generator when no API key is configured.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String, AnnotationError> {
        Err(AnnotationError::Disabled)
    }
}

pub struct Annotator {
    generator: Arc<dyn TextGenerator>,
    call_timeout: Duration,
}

impl Annotator {
    pub fn new(generator: Arc<dyn TextGenerator>, call_timeout: Duration) -> Self {
        Self {
            generator,
            call_timeout,
        }
    }

    /// Never fails: any generator problem yields the fallback annotation.
    pub async fn annotate(&self, signal: Signal) -> Annotation {
        let prompt = build_prompt(&signal);

        let outcome = match timeout(self.call_timeout, self.generator.complete(&prompt)).await {
            Ok(result) => result,
            Err(_) => Err(AnnotationError::Timeout(self.call_timeout)),
        };

        match outcome.map(|text| clean(&text)) {
            Ok(text) if !text.is_empty() => {
                debug!("{}: rationale received ({} chars)", signal.ticker, text.len());
                Annotation::ai(signal, text)
            }
            Ok(_) => {
                warn!("{}: {}. Using fallback text.", signal.ticker, AnnotationError::Empty);
                Annotation::fallback(signal)
            }
            Err(e) => {
                warn!("{}: {}. Using fallback text.", signal.ticker, e);
                Annotation::fallback(signal)
            }
        }
    }
}

pub fn build_prompt(signal: &Signal) -> String {
    let mut prompt = format!(
        "Stock {} closed at {:.2} on {:.2}x its average daily volume, above its {} of {:.2}",
        signal.ticker,
        signal.last_close,
        signal.relative_volume,
        signal.trend_kind,
        signal.trend_reference
    );
    if let Some(rsl) = signal.rsl {
        prompt.push_str(&format!(" (relative strength {rsl:.3})"));
    }
    prompt.push_str(
        ". Look for recent company news (buyback, approval, trial data, earnings). \
         Answer in at most two sentences: why is it rising, and how would you rate it?",
    );

    truncate_chars(&prompt, MAX_PROMPT_CHARS)
}

/// Single line, bounded length.
fn clean(text: &str) -> String {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&joined, MAX_RATIONALE_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
