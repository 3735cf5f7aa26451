use serde::{Deserialize, Serialize};

use super::Signal;

pub const FALLBACK_RATIONALE: &str = "technical breakout detected, no further commentary available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub signal: Signal,
    pub rationale_text: String,
    pub source: AnnotationSource,
}

impl Annotation {
    pub fn ai(signal: Signal, rationale_text: String) -> Self {
        Self {
            signal,
            rationale_text,
            source: AnnotationSource::Ai,
        }
    }

    pub fn fallback(signal: Signal) -> Self {
        Self {
            signal,
            rationale_text: FALLBACK_RATIONALE.to_string(),
            source: AnnotationSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == AnnotationSource::Fallback
    }
}
