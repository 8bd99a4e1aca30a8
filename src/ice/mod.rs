//! ICE pieces the local engine needs: structured candidates in their SDP
//! attribute form, host/relay gathering and the ICE server list.
pub mod candidate;
pub mod candidate_type;
pub mod gathering_service;
pub mod ice_server;

pub use candidate::Candidate;
pub use candidate_type::CandidateType;
pub use ice_server::{IceConfig, IceServer};
