use std::fmt;

/// Step of a negotiation round, as reported in failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStep {
    CreateOffer,
    CreateAnswer,
    SetLocalDescription,
    SetRemoteDescription,
    AddIceCandidate,
    SendSignal,
    Connect,
}

impl fmt::Display for NegotiationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateOffer => "createOffer",
            Self::CreateAnswer => "createAnswer",
            Self::SetLocalDescription => "setLocalDescription",
            Self::SetRemoteDescription => "setRemoteDescription",
            Self::AddIceCandidate => "addIceCandidate",
            Self::SendSignal => "sendSignal",
            Self::Connect => "connect",
        })
    }
}
