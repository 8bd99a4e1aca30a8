use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// The message could not be serialized.
    Encode(String),
    /// The incoming text is not a signaling message we understand.
    Decode(String),
    /// The transport's other end is gone.
    Disconnected,
}

impl fmt::Display for SignalingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "cannot encode signaling message: {e}"),
            Self::Decode(e) => write!(f, "cannot decode signaling message: {e}"),
            Self::Disconnected => write!(f, "signaling transport disconnected"),
        }
    }
}

impl std::error::Error for SignalingError {}
