use async_trait::async_trait;
use common::error::{AnnotationError, DeliveryError};

/// Short free-text completion for a bounded prompt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AnnotationError>;
}

/// Fire-and-forget delivery of one chat message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), DeliveryError>;
}
