//! Candidate Relay: one task per direction, draining an endpoint's outgoing
//! candidates into its peer.
pub mod candidate_relay;
pub mod relay_error;

pub use candidate_relay::{CandidateRelay, RelayReport, RelayTarget};
pub use relay_error::{DeliveryFailure, RelayError};
