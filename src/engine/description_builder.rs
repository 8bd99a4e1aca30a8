//! Writes and reads the SDP text exchanged by [`LocalEngine`]s.
//!
//! Only the subset the local engine emits is understood: session lines,
//! a BUNDLE group, and per-kind m-sections with ICE/DTLS attributes, a
//! direction, `msid` lines and inline candidates.
//!
//! [`LocalEngine`]: crate::engine::LocalEngine

use std::str::FromStr;

use crate::{engine::engine_error::EngineError, ice::candidate::CANDIDATE_PREFIX, media::MediaKind};

const CRLF: &str = "\r\n";
const DEFAULT_PORT: u16 = 9;
const DEFAULT_PROTO: &str = "UDP/TLS/RTP/SAVPF";
const DEFAULT_CONN_ADDR: &str = "0.0.0.0";
const ORIGIN_ADDR: &str = "127.0.0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SendRecv => "sendrecv",
            Self::SendOnly => "sendonly",
            Self::RecvOnly => "recvonly",
            Self::Inactive => "inactive",
        }
    }

    /// Does the side that wrote this direction send media?
    #[must_use]
    pub const fn sends(self) -> bool {
        matches!(self, Self::SendRecv | Self::SendOnly)
    }

    #[must_use]
    pub const fn receives(self) -> bool {
        matches!(self, Self::SendRecv | Self::RecvOnly)
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sendrecv" => Ok(Self::SendRecv),
            "sendonly" => Ok(Self::SendOnly),
            "recvonly" => Ok(Self::RecvOnly),
            "inactive" => Ok(Self::Inactive),
            _ => Err(()),
        }
    }
}

/// `a=msid:<stream> <track>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msid {
    pub stream_id: String,
    pub track_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSection {
    pub kind: MediaKind,
    pub mid: String,
    pub direction: Direction,
    pub msids: Vec<Msid>,
}

/// Session-level values shared by every m-section.
#[derive(Debug, Clone)]
pub struct SessionParams<'a> {
    pub session_id: u64,
    pub version: u32,
    pub ice_ufrag: &'a str,
    pub ice_pwd: &'a str,
    pub fingerprint: &'a str,
    /// `actpass` on offers, `active` on answers.
    pub setup: &'a str,
}

const fn rtpmap(kind: MediaKind) -> (u8, &'static str) {
    match kind {
        MediaKind::Audio => (0, "PCMU/8000"),
        MediaKind::Video => (96, "H264/90000"),
    }
}

/// Renders a full description.
#[must_use]
pub fn build(params: &SessionParams<'_>, sections: &[MediaSection]) -> String {
    let mut out = String::new();
    let mut line = |l: String| {
        out.push_str(&l);
        out.push_str(CRLF);
    };

    line("v=0".into());
    line(format!(
        "o=- {} {} IN IP4 {ORIGIN_ADDR}",
        params.session_id, params.version
    ));
    line("s=-".into());
    line("t=0 0".into());
    if !sections.is_empty() {
        let mids: Vec<&str> = sections.iter().map(|s| s.mid.as_str()).collect();
        line(format!("a=group:BUNDLE {}", mids.join(" ")));
    }

    for s in sections {
        let (pt, codec) = rtpmap(s.kind);
        line(format!("m={} {DEFAULT_PORT} {DEFAULT_PROTO} {pt}", s.kind));
        line(format!("c=IN IP4 {DEFAULT_CONN_ADDR}"));
        line(format!("a=mid:{}", s.mid));
        line(format!("a=ice-ufrag:{}", params.ice_ufrag));
        line(format!("a=ice-pwd:{}", params.ice_pwd));
        line(format!("a=fingerprint:sha-256 {}", params.fingerprint));
        line(format!("a=setup:{}", params.setup));
        line(format!("a={}", s.direction.as_str()));
        for m in &s.msids {
            line(format!("a=msid:{} {}", m.stream_id, m.track_id));
        }
        line("a=rtcp-mux".into());
        line(format!("a=rtpmap:{pt} {codec}"));
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDescription {
    pub session_id: u64,
    pub ice_ufrag: Option<String>,
    pub ice_pwd: Option<String>,
    pub fingerprint: Option<String>,
    pub sections: Vec<MediaSection>,
    /// Inline `a=candidate` lines: `(mid, full attribute value)`.
    pub candidates: Vec<(String, String)>,
}

impl ParsedDescription {
    #[must_use]
    pub fn section(&self, mid: &str) -> Option<&MediaSection> {
        self.sections.iter().find(|s| s.mid == mid)
    }
}

/// Parses text produced by [`build`] (or something close enough to it).
///
/// # Errors
/// `MalformedDescription` when the version line is missing, an m-line names
/// an unknown media kind, or ICE credentials are absent.
pub fn parse(sdp: &str) -> Result<ParsedDescription, EngineError> {
    let mut lines = sdp.lines().map(str::trim).filter(|l| !l.is_empty());
    if lines.next() != Some("v=0") {
        return Err(EngineError::MalformedDescription(
            "missing version line".into(),
        ));
    }

    let mut out = ParsedDescription::default();
    for l in lines {
        if let Some(origin) = l.strip_prefix("o=") {
            out.session_id = origin
                .split_whitespace()
                .nth(1)
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| EngineError::MalformedDescription(format!("bad origin: {l}")))?;
        } else if let Some(media) = l.strip_prefix("m=") {
            let kind = media
                .split_whitespace()
                .next()
                .and_then(|k| k.parse::<MediaKind>().ok())
                .ok_or_else(|| EngineError::MalformedDescription(format!("bad m-line: {l}")))?;
            out.sections.push(MediaSection {
                kind,
                mid: out.sections.len().to_string(),
                direction: Direction::SendRecv,
                msids: Vec::new(),
            });
        } else if let Some(attr) = l.strip_prefix("a=") {
            parse_attribute(&mut out, attr)?;
        }
    }

    if out.ice_ufrag.is_none() && !out.sections.is_empty() {
        return Err(EngineError::MalformedDescription(
            "missing ice-ufrag".into(),
        ));
    }
    Ok(out)
}

fn parse_attribute(out: &mut ParsedDescription, attr: &str) -> Result<(), EngineError> {
    let (key, value) = attr.split_once(':').unwrap_or((attr, ""));
    if let Ok(direction) = key.parse::<Direction>() {
        if let Some(s) = out.sections.last_mut() {
            s.direction = direction;
        }
        return Ok(());
    }

    match key {
        "ice-ufrag" => out.ice_ufrag = Some(value.to_string()),
        "ice-pwd" => out.ice_pwd = Some(value.to_string()),
        "fingerprint" => out.fingerprint = value.split_once(' ').map(|(_, fp)| fp.to_string()),
        "mid" => {
            if let Some(s) = out.sections.last_mut() {
                s.mid = value.to_string();
            }
        }
        "msid" => {
            let (stream_id, track_id) = value.split_once(' ').ok_or_else(|| {
                EngineError::MalformedDescription(format!("bad msid: {value}"))
            })?;
            if let Some(s) = out.sections.last_mut() {
                s.msids.push(Msid {
                    stream_id: stream_id.to_string(),
                    track_id: track_id.to_string(),
                });
            }
        }
        "candidate" => {
            let mid = out
                .sections
                .last()
                .map(|s| s.mid.clone())
                .unwrap_or_default();
            let candidate = format!("{CANDIDATE_PREFIX}{value}");
            out.candidates.push((mid, candidate));
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn params() -> SessionParams<'static> {
        SessionParams {
            session_id: 4_611_731_400_430_051_336,
            version: 2,
            ice_ufrag: "uF1x",
            ice_pwd: "pwdpwdpwdpwdpwdpwdpwdpwd",
            fingerprint: "AB:CD",
            setup: "actpass",
        }
    }

    #[test]
    fn builds_expected_lines() {
        let sdp = build(
            &params(),
            &[
                MediaSection {
                    kind: MediaKind::Audio,
                    mid: "0".into(),
                    direction: Direction::SendRecv,
                    msids: vec![Msid {
                        stream_id: "st".into(),
                        track_id: "a1".into(),
                    }],
                },
                MediaSection {
                    kind: MediaKind::Video,
                    mid: "1".into(),
                    direction: Direction::RecvOnly,
                    msids: Vec::new(),
                },
            ],
        );
        assert!(sdp.starts_with("v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n"));
        assert!(sdp.contains("a=group:BUNDLE 0 1\r\n"));
        assert!(sdp.contains("m=audio 9 UDP/TLS/RTP/SAVPF 0\r\n"));
        assert!(sdp.contains("a=rtpmap:96 H264/90000\r\n"));
        assert!(sdp.contains("a=msid:st a1\r\n"));
        assert!(sdp.contains("a=recvonly\r\n"));
    }

    #[test]
    fn parses_sections_and_inline_candidates() {
        let mut sdp = build(
            &params(),
            &[MediaSection {
                kind: MediaKind::Video,
                mid: "v".into(),
                direction: Direction::SendOnly,
                msids: vec![Msid {
                    stream_id: "st".into(),
                    track_id: "v1".into(),
                }],
            }],
        );
        sdp.push_str("a=candidate:1 1 udp 2130706431 127.0.0.1 5000 typ host\r\n");

        let parsed = parse(&sdp).unwrap();
        assert_eq!(parsed.session_id, 4_611_731_400_430_051_336);
        assert_eq!(parsed.ice_ufrag.as_deref(), Some("uF1x"));
        assert_eq!(parsed.fingerprint.as_deref(), Some("AB:CD"));
        let s = parsed.section("v").unwrap();
        assert_eq!(s.direction, Direction::SendOnly);
        assert_eq!(s.msids[0].track_id, "v1");
        assert_eq!(
            parsed.candidates,
            vec![(
                "v".to_string(),
                "candidate:1 1 udp 2130706431 127.0.0.1 5000 typ host".to_string()
            )]
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse("hello"),
            Err(EngineError::MalformedDescription(_))
        ));
        assert!(parse("v=0\r\nm=text 9 X 0\r\n").is_err());
        assert!(parse("v=0\r\nm=audio 9 X 0\r\na=mid:0\r\n").is_err());
    }
}
