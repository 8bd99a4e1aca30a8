//! Negotiation Orchestrator: sequences the offer/answer round for a call,
//! wires media and candidate relays, and owns teardown.
pub mod call;
pub mod call_config;
pub mod call_error;
pub mod call_status;
pub mod negotiation_step;
pub mod orchestrator;

pub use call::{Call, PeerLink};
pub use call_config::CallConfig;
pub use call_error::CallError;
pub use call_status::CallStatus;
pub use negotiation_step::NegotiationStep;
pub use orchestrator::NegotiationOrchestrator;
