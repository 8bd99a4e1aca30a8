use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{media::media_kind::MediaKind, util};

#[derive(Debug)]
struct TrackFlags {
    enabled: AtomicBool,
    live: AtomicBool,
}

/// One audio or video track.
///
/// Clones are views of the same track: they share the enabled/live flags.
/// Only the media module may flip those flags, so an Endpoint holding a clone
/// can read the state but never stop or mute the capture.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    id: String,
    kind: MediaKind,
    label: String,
    flags: Arc<TrackFlags>,
}

impl MediaTrack {
    #[must_use]
    pub fn new(kind: MediaKind, label: impl Into<String>) -> Self {
        Self::with_id(util::random_alphanumeric(12), kind, label)
    }

    #[must_use]
    pub fn with_id(id: impl Into<String>, kind: MediaKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            flags: Arc::new(TrackFlags {
                enabled: AtomicBool::new(true),
                live: AtomicBool::new(true),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn kind(&self) -> MediaKind {
        self.kind
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.flags.enabled.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.flags.live.load(Ordering::SeqCst)
    }

    /// True if both handles refer to the same underlying track.
    #[must_use]
    pub fn same_track(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.flags, &other.flags)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.flags.enabled.store(enabled, Ordering::SeqCst);
    }

    pub(crate) fn stop(&self) {
        self.flags.live.store(false, Ordering::SeqCst);
        self.flags.enabled.store(false, Ordering::SeqCst);
    }
}
