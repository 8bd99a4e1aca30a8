use async_trait::async_trait;

use crate::{
    media::{
        device_error::DeviceError, media_kind::MediaKind, media_stream::MediaStream,
        media_track::MediaTrack,
    },
    util,
};

/// Which kinds to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Source of the local stream (camera/microphone).
///
/// Device enumeration and permissions live behind this trait; callers only
/// consume the returned stream.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaStream, DeviceError>;
}

/// Capture that fabricates tracks without touching hardware.
#[derive(Debug, Clone)]
pub struct SyntheticCapture {
    audio_tracks: usize,
    video_tracks: usize,
    failure: Option<DeviceError>,
}

impl SyntheticCapture {
    #[must_use]
    pub const fn new(audio_tracks: usize, video_tracks: usize) -> Self {
        Self {
            audio_tracks,
            video_tracks,
            failure: None,
        }
    }

    /// A capture whose every acquisition fails with `err`.
    #[must_use]
    pub const fn failing(err: DeviceError) -> Self {
        Self {
            audio_tracks: 0,
            video_tracks: 0,
            failure: Some(err),
        }
    }
}

#[async_trait]
impl MediaCapture for SyntheticCapture {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaStream, DeviceError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if constraints.audio && self.audio_tracks == 0 {
            return Err(DeviceError::NotFound(MediaKind::Audio));
        }
        if constraints.video && self.video_tracks == 0 {
            return Err(DeviceError::NotFound(MediaKind::Video));
        }

        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.extend((0..self.audio_tracks).map(|i| {
                MediaTrack::new(MediaKind::Audio, format!("synthetic microphone {i}"))
            }));
        }
        if constraints.video {
            tracks.extend(
                (0..self.video_tracks)
                    .map(|i| MediaTrack::new(MediaKind::Video, format!("synthetic camera {i}"))),
            );
        }
        Ok(MediaStream::new(util::random_alphanumeric(16), tracks))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[tokio::test]
    async fn honours_constraints() {
        let cap = SyntheticCapture::new(1, 2);
        let s = cap
            .acquire(MediaConstraints {
                audio: false,
                video: true,
            })
            .await
            .expect("video available");
        assert_eq!(s.video_tracks().len(), 2);
        assert!(s.audio_tracks().is_empty());
    }

    #[tokio::test]
    async fn missing_device_is_reported() {
        let cap = SyntheticCapture::new(1, 0);
        let err = cap.acquire(MediaConstraints::default()).await.unwrap_err();
        assert_eq!(err, DeviceError::NotFound(MediaKind::Video));

        let denied = SyntheticCapture::failing(DeviceError::PermissionDenied);
        let result = denied.acquire(MediaConstraints::default()).await;
        assert!(matches!(result, Err(DeviceError::PermissionDenied)));
    }
}
