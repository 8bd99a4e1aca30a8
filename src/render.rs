//! Rendering collaborator: where local and remote streams get displayed.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{log::LogSink, media::MediaStream, sink_info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceId {
    LocalVideo,
    RemoteVideo,
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LocalVideo => "localVideo",
            Self::RemoteVideo => "remoteVideo",
        })
    }
}

/// Displays a stream on a surface. Pure side effect; never fails.
pub trait RenderSurface: Send + Sync {
    fn bind(&self, surface: SurfaceId, stream: &MediaStream);
}

/// Headless renderer: logs each binding.
pub struct LogRenderer {
    logger: Arc<dyn LogSink>,
}

impl LogRenderer {
    #[must_use]
    pub fn new(logger: Arc<dyn LogSink>) -> Self {
        Self { logger }
    }
}

impl RenderSurface for LogRenderer {
    fn bind(&self, surface: SurfaceId, stream: &MediaStream) {
        sink_info!(
            self.logger,
            "{surface} <- stream {} ({} tracks)",
            stream.id(),
            stream.tracks().len()
        );
    }
}

/// Remembers every binding as `(surface, stream id)`.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    bindings: Mutex<Vec<(SurfaceId, String)>>,
}

impl RecordingRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bindings(&self) -> Vec<(SurfaceId, String)> {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RenderSurface for RecordingRenderer {
    fn bind(&self, surface: SurfaceId, stream: &MediaStream) {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((surface, stream.id().to_string()));
    }
}
