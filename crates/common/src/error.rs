use std::time::Duration;

use thiserror::Error;

/// Fatal: the run never starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("required setting {0} is not set")]
    Missing(&'static str),
    #[error("setting {key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Per ticker. The ticker is skipped and counted as failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("provider answered HTTP {0}")]
    Status(u16),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("provider returned no bars")]
    Empty,
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("insufficient history: {have} bars, need {need}")]
    InsufficientHistory { have: usize, need: usize },
}

/// Per signal. Replaced by fallback text, the signal is still sent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotationError {
    #[error("text generation is not configured")]
    Disabled,
    #[error("request failed: {0}")]
    Request(String),
    #[error("generator answered HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("generator returned empty text")]
    Empty,
}

/// Per message. Logged and counted, never aborts the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeliveryError {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Per universe source. The source contributes nothing this run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UniverseError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("page answered HTTP {0}")]
    Status(u16),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unparseable page: {0}")]
    Malformed(String),
    #[error("no table column matched any of {0:?}")]
    NoSymbolColumn(Vec<String>),
}
