use std::fmt;

use crate::media::media_kind::MediaKind;

/// Capture failures. Fatal to starting a call; surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    NotFound(MediaKind),
    PermissionDenied,
    Unavailable(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(kind) => write!(f, "no {kind} capture device found"),
            Self::PermissionDenied => write!(f, "permission to capture media denied"),
            Self::Unavailable(msg) => write!(f, "capture device unavailable: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}
