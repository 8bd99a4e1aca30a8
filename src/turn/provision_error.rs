use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    /// The credential service did not answer in time.
    Timeout(Duration),
    /// The request itself failed.
    Fetch(String),
    /// The response is not the expected JSON object.
    Malformed(String),
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(d) => write!(f, "TURN credential request timed out after {d:?}"),
            Self::Fetch(e) => write!(f, "TURN credential request failed: {e}"),
            Self::Malformed(e) => write!(f, "unexpected TURN credential response: {e}"),
        }
    }
}

impl std::error::Error for ProvisionError {}
