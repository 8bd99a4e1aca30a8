use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::signaling::signaling_error::SignalingError;

/// Outbound half of the signaling channel. Messages are opaque text;
/// delivery guarantees belong to the implementation.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn send(&self, message: String) -> Result<(), SignalingError>;
}

/// In-process transport: everything sent comes out of the paired receiver.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    #[must_use]
    pub fn link() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl SignalingTransport for ChannelTransport {
    async fn send(&self, message: String) -> Result<(), SignalingError> {
        self.tx
            .send(message)
            .map_err(|_| SignalingError::Disconnected)
    }
}
