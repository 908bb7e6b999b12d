//! Output sink: where the finished aggregate goes at action 5.

mod export;
mod relay;

pub use export::{Exporter, LocalExport, EXPORT_FILE_NAME};
pub use relay::RelaySink;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::types::DeliveryPayload;

/// Sink's answer to a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkReply {
    /// Accepted; the sink now owns processing. Message is shown to the user.
    Ack { message: String },
    /// Refused; the caller falls back to a local export.
    Error { message: String },
}

#[async_trait]
pub trait OutputSink: Send + Sync {
    /// `Err` means the channel failed and no reply arrived.
    async fn deliver(&self, payload: &DeliveryPayload) -> Result<SinkReply>;

    /// After an `Ack`: wait for the sink to report that processing finished.
    /// Sinks without a completion signal return `None` right away.
    async fn completion(&self) -> Option<String> {
        None
    }
}
