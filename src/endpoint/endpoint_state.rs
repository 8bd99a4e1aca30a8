use std::fmt;

/// Lifecycle of one endpoint.
///
/// `New -> HaveLocalOffer | HaveRemoteOffer -> Negotiating -> Connected`,
/// with `Closed` reachable from anywhere and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    New,
    HaveLocalOffer,
    HaveRemoteOffer,
    /// Both descriptions of the current round are set.
    Negotiating,
    /// Negotiated and at least one remote candidate applied.
    Connected,
    Closed,
}

impl EndpointState {
    /// The current round has both descriptions.
    #[must_use]
    pub const fn is_negotiated(self) -> bool {
        matches!(self, Self::Negotiating | Self::Connected)
    }
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
