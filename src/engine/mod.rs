//! The negotiation backend behind an [`Endpoint`](crate::endpoint::Endpoint).
//!
//! Endpoints treat descriptions and candidates as opaque text; the engine is
//! the only layer that produces or reads their grammar.
pub mod description_builder;
pub mod engine_error;
pub mod local_engine;
pub mod offer_options;

use async_trait::async_trait;

use crate::{
    endpoint::{IceCandidate, Role, SessionDescription},
    ice::IceConfig,
    media::MediaStream,
};

pub use engine_error::EngineError;
pub use local_engine::{LocalEngine, LocalEngineFactory};
pub use offer_options::OfferOptions;

/// One peer's session backend.
///
/// Every method except `close` is a suspension point. The owning Endpoint
/// never runs two of them at the same time.
#[async_trait]
pub trait PeerEngine: Send {
    /// Produces offer text describing `local` (if any).
    async fn create_offer(&mut self, local: Option<&MediaStream>) -> Result<String, EngineError>;

    /// Produces answer text for the applied remote offer.
    async fn create_answer(&mut self, local: Option<&MediaStream>) -> Result<String, EngineError>;

    async fn apply_local_description(
        &mut self,
        desc: &SessionDescription,
    ) -> Result<(), EngineError>;

    /// Applies the remote description and returns the media it announces.
    async fn apply_remote_description(
        &mut self,
        desc: &SessionDescription,
    ) -> Result<Option<MediaStream>, EngineError>;

    async fn add_remote_candidate(&mut self, candidate: &IceCandidate) -> Result<(), EngineError>;

    /// Discovers local candidates. Called once the local description is set.
    async fn gather_candidates(&mut self) -> Result<Vec<IceCandidate>, EngineError>;

    /// Releases sockets and any other resource. Must be idempotent.
    fn close(&mut self);
}

/// Builds one engine per endpoint.
pub trait EngineFactory: Send + Sync {
    fn create(&self, role: Role, ice: &IceConfig) -> Box<dyn PeerEngine>;
}
