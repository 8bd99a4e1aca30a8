use std::sync::Arc;

use crate::{
    endpoint::{Endpoint, Role},
    log::LogSink,
    media::{
        capture::{MediaCapture, MediaConstraints},
        device_error::DeviceError,
        media_error::MediaError,
        media_kind::MediaKind,
        media_stream::MediaStream,
    },
    sink_debug, sink_info,
};

/// Both sides of the self-contained topology share one capture.
const MAX_ATTACHED: usize = 2;

/// Owns the captured local stream for as long as it is live.
///
/// Endpoints only receive clones of the stream (read-only track views); the
/// controller is the single place where tracks are muted or stopped.
pub struct MediaSessionController {
    stream: MediaStream,
    video_muted: bool,
    audio_muted: bool,
    propagate_audio_mute: bool,
    attached: Vec<Endpoint>,
    released: bool,
    logger: Arc<dyn LogSink>,
}

impl MediaSessionController {
    /// Acquires a stream from `capture`.
    ///
    /// With `propagate_audio_mute` off, the audio toggle only records the
    /// flag and leaves the tracks enabled.
    ///
    /// # Errors
    /// Whatever the capture device reports.
    pub async fn capture(
        capture: &dyn MediaCapture,
        constraints: MediaConstraints,
        propagate_audio_mute: bool,
        logger: Arc<dyn LogSink>,
    ) -> Result<Self, DeviceError> {
        sink_info!(logger, "Requesting local stream");
        let stream = capture.acquire(constraints).await?;
        sink_info!(
            logger,
            "Received local stream {} ({} audio, {} video)",
            stream.id(),
            stream.audio_tracks().len(),
            stream.video_tracks().len()
        );
        Ok(Self::from_stream(stream, propagate_audio_mute, logger))
    }

    #[must_use]
    pub fn from_stream(
        stream: MediaStream,
        propagate_audio_mute: bool,
        logger: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            stream,
            video_muted: false,
            audio_muted: false,
            propagate_audio_mute,
            attached: Vec::with_capacity(MAX_ATTACHED),
            released: false,
            logger,
        }
    }

    #[must_use]
    pub const fn stream(&self) -> &MediaStream {
        &self.stream
    }

    /// Exposes the tracks to `endpoint`. Attaching the same endpoint again is
    /// a no-op; closed endpoints no longer count against the limit.
    ///
    /// # Errors
    /// `Released` after [`release`](Self::release), `AttachLimit` when two
    /// endpoints already share the stream, `EndpointClosed` when the endpoint
    /// was closed first.
    pub fn attach(&mut self, endpoint: &Endpoint) -> Result<(), MediaError> {
        if self.released {
            return Err(MediaError::Released);
        }
        self.attached.retain(|e| !e.is_closed());
        if self.attached.iter().any(|e| e.same_endpoint(endpoint)) {
            return Ok(());
        }
        if self.attached.len() >= MAX_ATTACHED {
            return Err(MediaError::AttachLimit);
        }

        if !endpoint.attach_stream(self.stream.clone()) {
            return Err(MediaError::EndpointClosed);
        }
        sink_debug!(self.logger, "Added local stream to {}", endpoint.role());
        self.attached.push(endpoint.clone());
        Ok(())
    }

    pub fn detach(&mut self, role: Role) {
        self.attached.retain(|e| {
            if e.role() == role {
                e.detach_stream();
                false
            } else {
                true
            }
        });
    }

    pub fn detach_all(&mut self) {
        for e in self.attached.drain(..) {
            e.detach_stream();
        }
    }

    #[must_use]
    pub fn attached_roles(&self) -> Vec<Role> {
        self.attached.iter().map(Endpoint::role).collect()
    }

    #[must_use]
    pub const fn is_video_muted(&self) -> bool {
        self.video_muted
    }

    #[must_use]
    pub const fn is_audio_muted(&self) -> bool {
        self.audio_muted
    }

    /// Flips the video mute flag and enables/disables every video track.
    /// Returns the new muted state.
    ///
    /// # Errors
    /// `NoTrackAvailable` when there is no video track; nothing changes.
    pub fn toggle_video_mute(&mut self) -> Result<bool, MediaError> {
        let tracks = self.stream.video_tracks();
        if tracks.is_empty() {
            sink_info!(self.logger, "No local video available.");
            return Err(MediaError::NoTrackAvailable(MediaKind::Video));
        }
        self.video_muted = !self.video_muted;
        for t in tracks {
            t.set_enabled(!self.video_muted);
        }
        sink_info!(
            self.logger,
            "Video {}.",
            if self.video_muted { "muted" } else { "unmuted" }
        );
        Ok(self.video_muted)
    }

    /// Flips the audio mute flag. Tracks are only touched when the controller
    /// was built with `propagate_audio_mute`.
    ///
    /// # Errors
    /// `NoTrackAvailable` when there is no audio track; nothing changes.
    pub fn toggle_audio_mute(&mut self) -> Result<bool, MediaError> {
        let tracks = self.stream.audio_tracks();
        if tracks.is_empty() {
            sink_info!(self.logger, "No local audio available.");
            return Err(MediaError::NoTrackAvailable(MediaKind::Audio));
        }
        self.audio_muted = !self.audio_muted;
        if self.propagate_audio_mute {
            for t in tracks {
                t.set_enabled(!self.audio_muted);
            }
        }
        sink_info!(
            self.logger,
            "Audio {}.",
            if self.audio_muted { "muted" } else { "unmuted" }
        );
        Ok(self.audio_muted)
    }

    /// Stops every track. A second call does nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.detach_all();
        for t in self.stream.tracks() {
            t.stop();
        }
        self.released = true;
        sink_info!(self.logger, "Local stream {} released", self.stream.id());
    }

    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }

    /// Not released and at least one track still live.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.released && self.stream.tracks().iter().any(|t| t.is_live())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::{
        engine::{EngineFactory, LocalEngineFactory},
        ice::IceConfig,
        log::NoopLogSink,
        media::MediaTrack,
    };

    fn controller(audio: usize, video: usize, propagate: bool) -> MediaSessionController {
        let mut tracks = Vec::new();
        tracks.extend((0..audio).map(|_| MediaTrack::new(MediaKind::Audio, "mic")));
        tracks.extend((0..video).map(|_| MediaTrack::new(MediaKind::Video, "cam")));
        MediaSessionController::from_stream(
            MediaStream::new("s1", tracks),
            propagate,
            Arc::new(NoopLogSink),
        )
    }

    fn endpoint(role: Role) -> Endpoint {
        let engine = LocalEngineFactory::default().create(role, &IceConfig::default());
        Endpoint::new(role, engine, Arc::new(NoopLogSink))
    }

    #[test]
    fn video_toggle_reaches_tracks() {
        let mut m = controller(1, 2, false);
        assert!(m.toggle_video_mute().unwrap());
        assert!(m.stream().video_tracks().iter().all(|t| !t.is_enabled()));
        assert!(!m.toggle_video_mute().unwrap());
        assert!(m.stream().video_tracks().iter().all(|t| t.is_enabled()));
    }

    #[test]
    fn video_toggle_without_tracks_changes_nothing() {
        let mut m = controller(1, 0, false);
        assert_eq!(
            m.toggle_video_mute(),
            Err(MediaError::NoTrackAvailable(MediaKind::Video))
        );
        assert!(!m.is_video_muted());
    }

    #[test]
    fn audio_toggle_is_flag_only_unless_propagating() {
        let mut m = controller(1, 1, false);
        assert!(m.toggle_audio_mute().unwrap());
        assert!(m.is_audio_muted());
        assert!(m.stream().audio_tracks()[0].is_enabled());

        let mut p = controller(1, 1, true);
        assert!(p.toggle_audio_mute().unwrap());
        assert!(!p.stream().audio_tracks()[0].is_enabled());
    }

    #[test]
    fn attach_is_limited_to_two_endpoints() {
        let mut m = controller(1, 1, false);
        let a = endpoint(Role::A);
        let b = endpoint(Role::B);
        m.attach(&a).unwrap();
        m.attach(&a).unwrap();
        m.attach(&b).unwrap();
        assert_eq!(m.attached_roles(), vec![Role::A, Role::B]);
        assert_eq!(m.attach(&endpoint(Role::A)), Err(MediaError::AttachLimit));
        assert!(a.local_stream().is_some_and(|s| s.id() == "s1"));

        b.close();
        let fresh = endpoint(Role::B);
        m.attach(&fresh).unwrap();

        let closed = endpoint(Role::B);
        closed.close();
        m.detach(Role::B);
        assert_eq!(m.attach(&closed), Err(MediaError::EndpointClosed));
    }

    #[test]
    fn release_stops_tracks_once() {
        let mut m = controller(1, 1, false);
        let a = endpoint(Role::A);
        m.attach(&a).unwrap();
        m.release();
        assert!(!m.is_live());
        assert!(a.local_stream().is_none());
        assert!(m.stream().tracks().iter().all(|t| !t.is_live()));
        m.release();
        assert_eq!(m.attach(&a), Err(MediaError::Released));
    }
}
