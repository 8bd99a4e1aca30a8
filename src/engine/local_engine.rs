use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::{
    endpoint::{IceCandidate, Role, SdpType, SessionDescription},
    engine::{
        EngineFactory, PeerEngine,
        description_builder::{
            self, Direction, MediaSection, Msid, ParsedDescription, SessionParams,
        },
        engine_error::EngineError,
        offer_options::OfferOptions,
    },
    ice::{Candidate, IceConfig, gathering_service},
    media::{MediaKind, MediaStream, MediaTrack},
    util,
};

const UFRAG_LEN: usize = 4;
const PWD_LEN: usize = 24;
const SETUP_OFFER: &str = "actpass";
const SETUP_ANSWER: &str = "active";

/// In-process engine: real SDP text, host candidates on real UDP sockets,
/// no media transport.
pub struct LocalEngine {
    role: Role,
    ice: IceConfig,
    options: OfferOptions,
    session_id: u64,
    version: u32,
    ice_ufrag: String,
    ice_pwd: String,
    fingerprint: String,
    /// Descriptions produced and not yet applied.
    produced: Vec<String>,
    local_mids: Vec<String>,
    remote: Option<ParsedDescription>,
    remote_candidates: Vec<Candidate>,
    remote_gathering_done: bool,
    gathered: Option<gathering_service::Gathered>,
    closed: bool,
}

impl LocalEngine {
    #[must_use]
    pub fn new(role: Role, ice: IceConfig, options: OfferOptions) -> Self {
        Self {
            role,
            ice,
            options,
            session_id: util::random_u64() >> 1,
            version: 0,
            ice_ufrag: util::random_alphanumeric(UFRAG_LEN),
            ice_pwd: util::random_alphanumeric(PWD_LEN),
            fingerprint: certificate_fingerprint(),
            produced: Vec::new(),
            local_mids: Vec::new(),
            remote: None,
            remote_candidates: Vec::new(),
            remote_gathering_done: false,
            gathered: None,
            closed: false,
        }
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Remote candidates accepted so far, in the order they were added.
    #[must_use]
    pub fn remote_candidates(&self) -> &[Candidate] {
        &self.remote_candidates
    }

    #[must_use]
    pub const fn remote_gathering_done(&self) -> bool {
        self.remote_gathering_done
    }

    const fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed {
            Err(EngineError::Closed)
        } else {
            Ok(())
        }
    }

    fn render(&mut self, setup: &str, sections: &[MediaSection]) -> String {
        self.version += 1;
        let sdp = description_builder::build(
            &SessionParams {
                session_id: self.session_id,
                version: self.version,
                ice_ufrag: &self.ice_ufrag,
                ice_pwd: &self.ice_pwd,
                fingerprint: &self.fingerprint,
                setup,
            },
            sections,
        );
        self.produced.push(sdp.clone());
        sdp
    }
}

fn msids_of(local: Option<&MediaStream>, kind: MediaKind) -> Vec<Msid> {
    local
        .map(|s| {
            s.tracks_of(kind)
                .map(|t| Msid {
                    stream_id: s.id().to_string(),
                    track_id: t.id().to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Stand-in for the DTLS certificate digest: `XX:YY:..` over random bytes.
fn certificate_fingerprint() -> String {
    let mut hasher = Sha256::new();
    hasher.update(util::random_u64().to_be_bytes());
    hasher.update(util::random_alphanumeric(32).as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn remote_stream(parsed: &ParsedDescription) -> Option<MediaStream> {
    let mut stream_id = None;
    let mut tracks = Vec::new();
    for s in parsed.sections.iter().filter(|s| s.direction.sends()) {
        for m in &s.msids {
            stream_id.get_or_insert_with(|| m.stream_id.clone());
            tracks.push(MediaTrack::with_id(
                m.track_id.clone(),
                s.kind,
                format!("remote {}", s.kind),
            ));
        }
    }
    stream_id.map(|id| MediaStream::new(id, tracks))
}

#[async_trait]
impl PeerEngine for LocalEngine {
    async fn create_offer(&mut self, local: Option<&MediaStream>) -> Result<String, EngineError> {
        tokio::task::yield_now().await;
        self.ensure_open()?;

        let mut sections = Vec::new();
        for (kind, wanted) in [
            (MediaKind::Audio, self.options.offer_to_receive_audio),
            (MediaKind::Video, self.options.offer_to_receive_video),
        ] {
            let msids = msids_of(local, kind);
            let direction = if !msids.is_empty() {
                Direction::SendRecv
            } else if wanted {
                Direction::RecvOnly
            } else {
                continue;
            };
            sections.push(MediaSection {
                kind,
                mid: sections.len().to_string(),
                direction,
                msids,
            });
        }
        Ok(self.render(SETUP_OFFER, &sections))
    }

    async fn create_answer(&mut self, local: Option<&MediaStream>) -> Result<String, EngineError> {
        tokio::task::yield_now().await;
        self.ensure_open()?;
        let Some(remote) = &self.remote else {
            return Err(EngineError::Rejected("no remote offer applied".into()));
        };

        // Mirror the offer's sections, in order, keeping its mids.
        let sections: Vec<MediaSection> = remote
            .sections
            .iter()
            .map(|offered| {
                let msids = msids_of(local, offered.kind);
                let sending = !msids.is_empty() && offered.direction.receives();
                let direction = match (sending, offered.direction.sends()) {
                    (true, true) => Direction::SendRecv,
                    (true, false) => Direction::SendOnly,
                    (false, true) => Direction::RecvOnly,
                    (false, false) => Direction::Inactive,
                };
                MediaSection {
                    kind: offered.kind,
                    mid: offered.mid.clone(),
                    direction,
                    msids: if sending { msids } else { Vec::new() },
                }
            })
            .collect();
        Ok(self.render(SETUP_ANSWER, &sections))
    }

    async fn apply_local_description(
        &mut self,
        desc: &SessionDescription,
    ) -> Result<(), EngineError> {
        tokio::task::yield_now().await;
        self.ensure_open()?;
        if !self.produced.iter().any(|p| *p == desc.sdp) {
            return Err(EngineError::ForeignDescription);
        }
        let parsed = description_builder::parse(&desc.sdp)?;
        self.local_mids = parsed.sections.into_iter().map(|s| s.mid).collect();
        self.produced.clear();
        Ok(())
    }

    async fn apply_remote_description(
        &mut self,
        desc: &SessionDescription,
    ) -> Result<Option<MediaStream>, EngineError> {
        tokio::task::yield_now().await;
        self.ensure_open()?;
        let parsed = description_builder::parse(&desc.sdp)?;
        if desc.sdp_type == SdpType::Answer && parsed.sections.len() != self.local_mids.len() {
            return Err(EngineError::Rejected(format!(
                "answer has {} media sections, offer had {}",
                parsed.sections.len(),
                self.local_mids.len()
            )));
        }

        let mut inline = Vec::with_capacity(parsed.candidates.len());
        for (_, attr) in &parsed.candidates {
            inline.push(
                attr.parse::<Candidate>()
                    .map_err(EngineError::MalformedCandidate)?,
            );
        }
        let stream = remote_stream(&parsed);
        self.remote_candidates.extend(inline);
        self.remote = Some(parsed);
        Ok(stream)
    }

    async fn add_remote_candidate(&mut self, candidate: &IceCandidate) -> Result<(), EngineError> {
        tokio::task::yield_now().await;
        self.ensure_open()?;
        let Some(remote) = &self.remote else {
            return Err(EngineError::Rejected("no remote description".into()));
        };

        match candidate {
            IceCandidate::EndOfCandidates => {
                self.remote_gathering_done = true;
                Ok(())
            }
            IceCandidate::Candidate(init) => {
                if let Some(mid) = &init.sdp_mid
                    && remote.section(mid).is_none()
                {
                    return Err(EngineError::MalformedCandidate(format!(
                        "unknown media section {mid}"
                    )));
                }
                let parsed = init
                    .candidate
                    .parse::<Candidate>()
                    .map_err(EngineError::MalformedCandidate)?;
                self.remote_candidates.push(parsed);
                Ok(())
            }
        }
    }

    async fn gather_candidates(&mut self) -> Result<Vec<IceCandidate>, EngineError> {
        tokio::task::yield_now().await;
        self.ensure_open()?;
        let gathered = gathering_service::gather(&self.ice).map_err(EngineError::Gathering)?;

        let mid = self.local_mids.first().cloned();
        let index = mid.as_ref().map(|_| 0);
        let out = gathered
            .candidates
            .iter()
            .map(|c| IceCandidate::new(c.to_attribute(), mid.clone(), index))
            .collect();
        self.gathered = Some(gathered);
        Ok(out)
    }

    fn close(&mut self) {
        self.closed = true;
        self.gathered = None;
        self.produced.clear();
    }
}

/// Builds [`LocalEngine`]s sharing one set of offer options.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalEngineFactory {
    pub options: OfferOptions,
}

impl LocalEngineFactory {
    #[must_use]
    pub const fn new(options: OfferOptions) -> Self {
        Self { options }
    }
}

impl EngineFactory for LocalEngineFactory {
    fn create(&self, role: Role, ice: &IceConfig) -> Box<dyn PeerEngine> {
        Box::new(LocalEngine::new(role, ice.clone(), self.options))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn stream(audio: usize, video: usize) -> MediaStream {
        let mut tracks = Vec::new();
        tracks.extend((0..audio).map(|_| MediaTrack::new(MediaKind::Audio, "mic")));
        tracks.extend((0..video).map(|_| MediaTrack::new(MediaKind::Video, "cam")));
        MediaStream::new("local", tracks)
    }

    fn engine(role: Role, options: OfferOptions) -> LocalEngine {
        LocalEngine::new(role, IceConfig::default(), options)
    }

    #[tokio::test]
    async fn offer_answer_exchange_carries_tracks() {
        let local = stream(1, 1);
        let mut a = engine(Role::A, OfferOptions::default());
        let mut b = engine(Role::B, OfferOptions::default());

        let offer = SessionDescription::offer(a.create_offer(Some(&local)).await.unwrap());
        assert!(offer.sdp.contains("a=setup:actpass"));
        a.apply_local_description(&offer).await.unwrap();

        let seen = b.apply_remote_description(&offer).await.unwrap().unwrap();
        assert_eq!(seen.id(), "local");
        assert_eq!(seen.tracks().len(), 2);
        assert_eq!(seen.video_tracks()[0].id(), local.video_tracks()[0].id());

        let answer = SessionDescription::answer(b.create_answer(None).await.unwrap());
        assert!(answer.sdp.contains("a=setup:active"));
        assert!(answer.sdp.contains("a=recvonly"));
        b.apply_local_description(&answer).await.unwrap();
        assert!(a.apply_remote_description(&answer).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn receive_only_sections_follow_options() {
        let mut e = engine(
            Role::A,
            OfferOptions {
                offer_to_receive_audio: false,
                offer_to_receive_video: true,
            },
        );
        let sdp = e.create_offer(None).await.unwrap();
        assert!(!sdp.contains("m=audio"));
        assert!(sdp.contains("m=video"));
        assert!(sdp.contains("a=recvonly"));
    }

    #[tokio::test]
    async fn foreign_local_description_is_refused() {
        let mut a = engine(Role::A, OfferOptions::default());
        let mut b = engine(Role::B, OfferOptions::default());
        let theirs = SessionDescription::offer(b.create_offer(None).await.unwrap());
        assert_eq!(
            a.apply_local_description(&theirs).await,
            Err(EngineError::ForeignDescription)
        );
    }

    #[tokio::test]
    async fn candidates_need_a_known_section() {
        let mut a = engine(Role::A, OfferOptions::default());
        let mut b = engine(Role::B, OfferOptions::default());
        let offer = SessionDescription::offer(a.create_offer(None).await.unwrap());
        a.apply_local_description(&offer).await.unwrap();

        let host = IceCandidate::new(
            "candidate:1 1 udp 2130706431 127.0.0.1 5000 typ host",
            Some("0".into()),
            Some(0),
        );
        assert!(matches!(
            b.add_remote_candidate(&host).await,
            Err(EngineError::Rejected(_))
        ));

        b.apply_remote_description(&offer).await.unwrap();
        b.add_remote_candidate(&host).await.unwrap();
        let stray = IceCandidate::new(
            "candidate:1 1 udp 2130706431 127.0.0.1 5000 typ host",
            Some("9".into()),
            Some(9),
        );
        assert!(matches!(
            b.add_remote_candidate(&stray).await,
            Err(EngineError::MalformedCandidate(_))
        ));
        assert!(matches!(
            b.add_remote_candidate(&IceCandidate::new("garbage", None, None))
                .await,
            Err(EngineError::MalformedCandidate(_))
        ));
        b.add_remote_candidate(&IceCandidate::EndOfCandidates)
            .await
            .unwrap();
        assert_eq!(b.remote_candidates().len(), 1);
        assert!(b.remote_gathering_done());
    }

    #[tokio::test]
    async fn gathering_tags_first_section_and_close_stops_everything() {
        let mut a = engine(Role::A, OfferOptions::default());
        let offer = SessionDescription::offer(a.create_offer(None).await.unwrap());
        a.apply_local_description(&offer).await.unwrap();

        let cands = a.gather_candidates().await.unwrap();
        assert!(!cands.is_empty());
        let IceCandidate::Candidate(first) = &cands[0] else {
            panic!("expected a real candidate");
        };
        assert!(first.candidate.starts_with("candidate:"));
        assert_eq!(first.sdp_mid.as_deref(), Some("0"));

        a.close();
        a.close();
        assert_eq!(a.create_offer(None).await, Err(EngineError::Closed));
    }
}
