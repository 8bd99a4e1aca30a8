use std::fmt;

/// Status of the one call an orchestrator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// Offer/answer round or candidate exchange in progress.
    Negotiating,
    /// Every endpoint of the call is connected.
    Connected,
    /// The last round failed; endpoints kept their last good state.
    NegotiationFailed,
    Ended,
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
