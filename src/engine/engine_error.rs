use std::fmt;

/// Failures reported by a [`PeerEngine`](crate::engine::PeerEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The description text could not be understood.
    MalformedDescription(String),
    /// A local description that this engine never produced.
    ForeignDescription,
    /// The candidate text could not be parsed or does not match any section.
    MalformedCandidate(String),
    /// No candidate could be gathered.
    Gathering(String),
    /// The engine refused the step for a backend-specific reason.
    Rejected(String),
    Closed,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedDescription(msg) => write!(f, "malformed session description: {msg}"),
            Self::ForeignDescription => {
                write!(f, "local description was not produced by this endpoint")
            }
            Self::MalformedCandidate(msg) => write!(f, "malformed ICE candidate: {msg}"),
            Self::Gathering(msg) => write!(f, "candidate gathering failed: {msg}"),
            Self::Rejected(msg) => write!(f, "rejected: {msg}"),
            Self::Closed => write!(f, "engine closed"),
        }
    }
}

impl std::error::Error for EngineError {}
