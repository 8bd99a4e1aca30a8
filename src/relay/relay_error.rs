use std::fmt;

use crate::{endpoint::{EndpointError, Role}, signaling::SignalingError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    Endpoint(EndpointError),
    Signaling(SignalingError),
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoint(e) => write!(f, "{e}"),
            Self::Signaling(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The peer could not take the candidate, usually because it is closed.
    DeliveryFailed { from: Role, source: DeliveryFailure },
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeliveryFailed { from, source } => {
                write!(f, "candidate from {from} not delivered: {source}")
            }
        }
    }
}

impl std::error::Error for RelayError {}
