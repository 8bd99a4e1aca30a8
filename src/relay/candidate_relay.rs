use std::sync::Arc;

use crate::{
    endpoint::{Endpoint, IceCandidate},
    log::LogSink,
    relay::relay_error::{DeliveryFailure, RelayError},
    signaling::{SignalingMessage, SignalingTransport},
    sink_debug, sink_info, sink_warn,
};

/// Where a relay hands candidates over.
#[derive(Clone)]
pub enum RelayTarget {
    /// The peer lives in this process.
    Endpoint(Endpoint),
    /// The peer is reached through signaling.
    Signaling(Arc<dyn SignalingTransport>),
}

/// Totals for one relay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Moves candidates discovered by one endpoint to its peer, in discovery
/// order. One relay per direction.
pub struct CandidateRelay {
    source: Endpoint,
    target: RelayTarget,
    logger: Arc<dyn LogSink>,
}

impl CandidateRelay {
    #[must_use]
    pub fn new(source: Endpoint, target: RelayTarget, logger: Arc<dyn LogSink>) -> Self {
        Self {
            source,
            target,
            logger,
        }
    }

    /// Forwards candidates until the source endpoint closes. Failed
    /// deliveries are logged and dropped; they never stop the loop.
    pub async fn run(self) -> RelayReport {
        let mut report = RelayReport::default();
        loop {
            for candidate in self.source.flush_outgoing_candidates() {
                match self.deliver(candidate).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        sink_warn!(self.logger, "{e}");
                        report.dropped += 1;
                    }
                }
            }
            if self.source.is_closed() {
                break;
            }
            self.source.candidates_available().await;
        }
        sink_info!(
            self.logger,
            "relay from {} done: {} delivered, {} dropped",
            self.source.role(),
            report.delivered,
            report.dropped
        );
        report
    }

    /// Hands one candidate to the peer.
    ///
    /// # Errors
    /// `DeliveryFailed` when the peer endpoint refuses it (typically because
    /// it is closed) or the signaling transport is gone.
    pub async fn deliver(&self, candidate: IceCandidate) -> Result<(), RelayError> {
        let from = self.source.role();
        match &self.target {
            RelayTarget::Endpoint(peer) => {
                peer.add_ice_candidate(candidate)
                    .await
                    .map_err(|e| RelayError::DeliveryFailed {
                        from,
                        source: DeliveryFailure::Endpoint(e),
                    })?;
                sink_debug!(self.logger, "{from} -> {} delivered", peer.role());
            }
            RelayTarget::Signaling(transport) => {
                let wire = SignalingMessage::Candidate(candidate)
                    .encode()
                    .map_err(|e| RelayError::DeliveryFailed {
                        from,
                        source: DeliveryFailure::Signaling(e),
                    })?;
                transport
                    .send(wire)
                    .await
                    .map_err(|e| RelayError::DeliveryFailed {
                        from,
                        source: DeliveryFailure::Signaling(e),
                    })?;
            }
        }
        Ok(())
    }
}
