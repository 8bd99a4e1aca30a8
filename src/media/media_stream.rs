use crate::media::{media_kind::MediaKind, media_track::MediaTrack};

/// An ordered set of tracks sharing one stream id.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    #[must_use]
    pub fn new(id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: MediaKind) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(move |t| t.kind() == kind)
    }

    #[must_use]
    pub fn video_tracks(&self) -> Vec<&MediaTrack> {
        self.tracks_of(MediaKind::Video).collect()
    }

    #[must_use]
    pub fn audio_tracks(&self) -> Vec<&MediaTrack> {
        self.tracks_of(MediaKind::Audio).collect()
    }

    #[must_use]
    pub fn has_kind(&self, kind: MediaKind) -> bool {
        self.tracks_of(kind).next().is_some()
    }
}
