//! One side of a call: description slots, the remote candidate buffer, the
//! outgoing candidate queue and the per-endpoint state machine.
pub mod endpoint;
pub mod endpoint_error;
pub mod endpoint_state;
pub mod ice_candidate;
pub mod role;
pub mod session_description;

pub use endpoint::{CandidateOutcome, Endpoint};
pub use endpoint_error::{DescriptionSlot, EndpointError};
pub use endpoint_state::EndpointState;
pub use ice_candidate::{CandidateInit, IceCandidate};
pub use role::Role;
pub use session_description::{SdpType, SessionDescription};
