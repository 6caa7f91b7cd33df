use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::notice::{Channel, Notice};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink not configured: {0}")]
    NotConfigured(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("sink rejected message (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Downstream messaging transport.
///
/// One call delivers one notice; success means the transport accepted it.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, channel: Channel, notice: &Notice) -> Result<(), SinkError>;
}

#[async_trait]
impl<S> NotificationSink for Arc<S>
where
    S: NotificationSink + ?Sized,
{
    async fn send(&self, channel: Channel, notice: &Notice) -> Result<(), SinkError> {
        (**self).send(channel, notice).await
    }
}
