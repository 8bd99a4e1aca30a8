use std::fmt;

use crate::media::media_kind::MediaKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Mute toggle requested for a kind the stream has no track of.
    NoTrackAvailable(MediaKind),
    /// The stream is already shared by two endpoints.
    AttachLimit,
    /// The endpoint was closed before the tracks could be attached.
    EndpointClosed,
    /// The capture has been released.
    Released,
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTrackAvailable(kind) => write!(f, "No local {kind} available."),
            Self::AttachLimit => write!(f, "local stream already attached to two endpoints"),
            Self::EndpointClosed => write!(f, "endpoint closed before attach"),
            Self::Released => write!(f, "local stream already released"),
        }
    }
}

impl std::error::Error for MediaError {}
