//! Local media: tracks, streams, the capture collaborator and the
//! controller that owns a captured stream for the lifetime of a call.
pub mod capture;
pub mod device_error;
pub mod media_error;
pub mod media_kind;
pub mod media_session;
pub mod media_stream;
pub mod media_track;

pub use capture::{MediaCapture, MediaConstraints, SyntheticCapture};
pub use device_error::DeviceError;
pub use media_error::MediaError;
pub use media_kind::MediaKind;
pub use media_session::MediaSessionController;
pub use media_stream::MediaStream;
pub use media_track::MediaTrack;
