//! PeerCall sets up a two-party audio/video call between peer endpoints
//! without a media server.
//!
//! It provides one binary:
//! - `call_demo`: runs a loopback call between two in-process endpoints and
//!   logs every negotiation step.
//!
//! The negotiation is split into an offer/answer state machine per
//! [`endpoint`], a [`relay`] per direction for trickled candidates, and the
//! [`orchestrator`] that sequences one call from media capture to hang-up.

/// Handles configuration loading and management.
pub mod config;
/// One side of a call and its description/candidate state machine.
pub mod endpoint;
/// Session backends that produce and consume descriptions and candidates.
pub mod engine;
/// ICE candidates, servers and host candidate gathering.
pub mod ice;
/// Logging utilities for the application.
pub mod log;
/// Local capture, tracks and the media session controller.
pub mod media;
/// Sequences the offer/answer round and owns the call lifecycle.
pub mod orchestrator;
/// Forwards trickled candidates between the two sides.
pub mod relay;
/// Display surfaces for local and remote streams.
pub mod render;
/// Signaling message codec and transport.
pub mod signaling;
/// TURN credential provisioning.
pub mod turn;
/// Small helpers shared across modules.
pub mod util;
