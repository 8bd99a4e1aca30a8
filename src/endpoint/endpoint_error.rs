use std::fmt;

use crate::{
    endpoint::{endpoint_state::EndpointState, session_description::SdpType},
    engine::EngineError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionSlot {
    Local,
    Remote,
}

impl fmt::Display for DescriptionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Remote => "remote",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// `create_offer` while a local offer is still waiting for its answer.
    OfferPending,
    /// The slot already holds a different description for this round.
    DescriptionConflict(DescriptionSlot),
    /// Operation not allowed in the current state.
    InvalidState {
        operation: &'static str,
        state: EndpointState,
    },
    /// A description of the wrong type for the slot's position in the round.
    UnexpectedType {
        slot: DescriptionSlot,
        sdp_type: SdpType,
        state: EndpointState,
    },
    /// The engine rejected the step.
    Engine(EngineError),
    /// The endpoint is closed, or was closed while the step was in flight.
    Closed,
}

impl EndpointError {
    /// Contract violations the orchestrator's compound operations never
    /// trigger, as opposed to runtime failures.
    #[must_use]
    pub const fn is_logic_error(&self) -> bool {
        matches!(
            self,
            Self::DescriptionConflict(_) | Self::InvalidState { .. } | Self::UnexpectedType { .. }
        )
    }
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OfferPending => write!(f, "a local offer is already pending"),
            Self::DescriptionConflict(slot) => {
                write!(f, "{slot} description already set for this round")
            }
            Self::InvalidState { operation, state } => {
                write!(f, "{operation} not allowed in state {state}")
            }
            Self::UnexpectedType {
                slot,
                sdp_type,
                state,
            } => write!(f, "cannot set {slot} {sdp_type} in state {state}"),
            Self::Engine(e) => write!(f, "engine error: {e}"),
            Self::Closed => write!(f, "endpoint closed"),
        }
    }
}

impl std::error::Error for EndpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EngineError> for EndpointError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}
