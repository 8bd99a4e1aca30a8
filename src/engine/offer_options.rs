use crate::config::Config;

const MEDIA_SECTION: &str = "Media";

/// Whether an offer asks for a kind of media the local side does not send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferOptions {
    pub offer_to_receive_audio: bool,
    pub offer_to_receive_video: bool,
}

impl Default for OfferOptions {
    fn default() -> Self {
        Self {
            offer_to_receive_audio: true,
            offer_to_receive_video: true,
        }
    }
}

impl OfferOptions {
    /// Reads `[Media] offer_to_receive_audio` / `offer_to_receive_video`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let d = Self::default();
        Self {
            offer_to_receive_audio: config.get_bool(
                MEDIA_SECTION,
                "offer_to_receive_audio",
                d.offer_to_receive_audio,
            ),
            offer_to_receive_video: config.get_bool(
                MEDIA_SECTION,
                "offer_to_receive_video",
                d.offer_to_receive_video,
            ),
        }
    }
}
