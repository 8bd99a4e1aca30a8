use std::time::Duration;

use crate::{config::Config, engine::OfferOptions, ice::IceConfig, media::MediaConstraints};

const MEDIA_SECTION: &str = "Media";
const CALL_SECTION: &str = "Call";
const TURN_SECTION: &str = "Turn";

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_TURN_TIMEOUT_MS: u64 = 3_000;

/// Everything a call needs from the configuration file.
#[derive(Debug, Clone)]
pub struct CallConfig {
    pub ice: IceConfig,
    pub constraints: MediaConstraints,
    pub offer: OfferOptions,
    /// Audio mute also disables the audio tracks.
    pub propagate_audio_mute: bool,
    pub connect_timeout: Duration,
    /// Credential service asked for a TURN relay when none is configured.
    pub turn_url: Option<String>,
    pub turn_timeout: Duration,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            ice: IceConfig::default(),
            constraints: MediaConstraints::default(),
            offer: OfferOptions::default(),
            propagate_audio_mute: false,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            turn_url: None,
            turn_timeout: Duration::from_millis(DEFAULT_TURN_TIMEOUT_MS),
        }
    }
}

impl CallConfig {
    /// Reads the `[Ice]`, `[Media]`, `[Call]` and `[Turn]` sections; missing
    /// keys keep their defaults.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let d = MediaConstraints::default();
        Self {
            ice: IceConfig::from_config(config),
            constraints: MediaConstraints {
                audio: config.get_bool(MEDIA_SECTION, "audio", d.audio),
                video: config.get_bool(MEDIA_SECTION, "video", d.video),
            },
            offer: OfferOptions::from_config(config),
            propagate_audio_mute: config.get_bool(MEDIA_SECTION, "propagate_audio_mute", false),
            connect_timeout: Duration::from_millis(config.get_u64(
                CALL_SECTION,
                "connect_timeout_ms",
                DEFAULT_CONNECT_TIMEOUT_MS,
            )),
            turn_url: config
                .get_non_empty(TURN_SECTION, "url")
                .map(str::to_string),
            turn_timeout: Duration::from_millis(config.get_u64(
                TURN_SECTION,
                "timeout_ms",
                DEFAULT_TURN_TIMEOUT_MS,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_sections_and_keeps_defaults() {
        let cfg = Config::parse(
            "[Media]\nvideo = no\npropagate_audio_mute = yes\noffer_to_receive_audio = false\n\
             [Call]\nconnect_timeout_ms = 1200\n[Turn]\nurl = https://turn.example/turn\n",
        );
        let c = CallConfig::from_config(&cfg);
        assert!(c.constraints.audio);
        assert!(!c.constraints.video);
        assert!(c.propagate_audio_mute);
        assert!(!c.offer.offer_to_receive_audio);
        assert!(c.offer.offer_to_receive_video);
        assert_eq!(c.connect_timeout, Duration::from_millis(1200));
        assert_eq!(c.turn_url.as_deref(), Some("https://turn.example/turn"));
        assert_eq!(c.turn_timeout, Duration::from_millis(DEFAULT_TURN_TIMEOUT_MS));
    }
}
