//! Signaling for the two-process topology: the JSON message codec and the
//! outbound transport collaborator.
pub mod signaling_error;
pub mod signaling_message;
pub mod transport;

pub use signaling_error::SignalingError;
pub use signaling_message::SignalingMessage;
pub use transport::{ChannelTransport, SignalingTransport};
