use tokio::sync::mpsc;

use super::Message;

#[derive(Debug, thiserror::Error)]
#[error("message sink closed")]
pub struct SinkClosed(pub Message);

/// Consumer side of the reader pump.
pub trait MessageSink: Send + Sync {
    /// Hand over a decoded message without blocking.
    fn push(&self, message: Message) -> Result<(), SinkClosed>;
}

impl MessageSink for mpsc::UnboundedSender<Message> {
    fn push(&self, message: Message) -> Result<(), SinkClosed> {
        self.send(message).map_err(|e| SinkClosed(e.0))
    }
}
