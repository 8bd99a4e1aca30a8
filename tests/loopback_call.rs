#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use peercall::{
    endpoint::{EndpointError, EndpointState, IceCandidate, Role, SessionDescription},
    engine::{EngineError, EngineFactory, LocalEngineFactory, PeerEngine},
    ice::IceConfig,
    log::{LogLevel, LogSink, MemoryLogSink},
    media::{MediaConstraints, MediaError, MediaKind, MediaStream, SyntheticCapture},
    orchestrator::{CallConfig, CallError, CallStatus, NegotiationOrchestrator, NegotiationStep},
    render::{RecordingRenderer, SurfaceId},
};

/// Wraps a real engine and makes the first `failures` answers fail.
struct FlakyEngine {
    inner: Box<dyn PeerEngine>,
    failures: Arc<AtomicUsize>,
}

#[async_trait]
impl PeerEngine for FlakyEngine {
    async fn create_offer(&mut self, local: Option<&MediaStream>) -> Result<String, EngineError> {
        self.inner.create_offer(local).await
    }

    async fn create_answer(&mut self, local: Option<&MediaStream>) -> Result<String, EngineError> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(EngineError::Rejected("answer refused".into()));
        }
        self.inner.create_answer(local).await
    }

    async fn apply_local_description(
        &mut self,
        desc: &SessionDescription,
    ) -> Result<(), EngineError> {
        self.inner.apply_local_description(desc).await
    }

    async fn apply_remote_description(
        &mut self,
        desc: &SessionDescription,
    ) -> Result<Option<MediaStream>, EngineError> {
        self.inner.apply_remote_description(desc).await
    }

    async fn add_remote_candidate(&mut self, candidate: &IceCandidate) -> Result<(), EngineError> {
        self.inner.add_remote_candidate(candidate).await
    }

    async fn gather_candidates(&mut self) -> Result<Vec<IceCandidate>, EngineError> {
        self.inner.gather_candidates().await
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

struct FlakyFactory {
    failures: Arc<AtomicUsize>,
}

impl EngineFactory for FlakyFactory {
    fn create(&self, role: Role, ice: &IceConfig) -> Box<dyn PeerEngine> {
        Box::new(FlakyEngine {
            inner: LocalEngineFactory::default().create(role, ice),
            failures: self.failures.clone(),
        })
    }
}

fn setup(
    config: CallConfig,
) -> (NegotiationOrchestrator, Arc<RecordingRenderer>, Arc<MemoryLogSink>) {
    let renderer = Arc::new(RecordingRenderer::new());
    let logs = Arc::new(MemoryLogSink::new());
    let sink: Arc<dyn LogSink> = logs.clone();
    let o = NegotiationOrchestrator::local(config, renderer.clone(), sink);
    (o, renderer, logs)
}

#[tokio::test]
async fn loopback_call_connects_and_shows_both_streams() {
    let (mut o, renderer, logs) = setup(CallConfig::default());
    o.acquire_media(&SyntheticCapture::new(1, 1)).await.unwrap();
    let local_id = o.media().unwrap().stream().id().to_string();

    let status = o.start_call(Role::A).await.unwrap();
    assert!(matches!(status, CallStatus::Negotiating | CallStatus::Connected));
    assert_eq!(o.wait_until_connected().await, Ok(CallStatus::Connected));

    let call = o.call().unwrap();
    let a = call.endpoint(Role::A).unwrap();
    let b = call.endpoint(Role::B).unwrap();
    assert_eq!(a.local_description(), b.remote_description());
    assert_eq!(b.local_description(), a.remote_description());
    assert_eq!(a.state(), EndpointState::Connected);
    assert_eq!(b.state(), EndpointState::Connected);
    assert!(!b.applied_candidates().is_empty());

    let bindings = renderer.bindings();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0], (SurfaceId::LocalVideo, local_id.clone()));
    assert_eq!(bindings[1], (SurfaceId::RemoteVideo, local_id));

    assert!(logs.contains(LogLevel::Info, "Offer from A"));
    assert!(logs.contains(LogLevel::Info, "Answer from B"));
    assert!(logs.contains(LogLevel::Info, "Call connected"));
}

#[tokio::test]
async fn second_start_is_rejected_and_keeps_the_call() {
    let (mut o, _, _) = setup(CallConfig::default());
    o.acquire_media(&SyntheticCapture::new(1, 1)).await.unwrap();
    o.start_call(Role::A).await.unwrap();
    assert_eq!(o.wait_until_connected().await, Ok(CallStatus::Connected));
    let a = o.call().unwrap().local().clone();
    let b = o.call().unwrap().peer().unwrap().clone();
    let snapshot = |o: &NegotiationOrchestrator| {
        let call = o.call().unwrap();
        call.endpoints()
            .into_iter()
            .map(|e| (e.state(), e.local_description(), e.remote_description()))
            .collect::<Vec<_>>()
    };
    let before = snapshot(&o);

    let err = o.start_call(Role::B).await.unwrap_err();
    assert_eq!(err, CallError::CallActive(CallStatus::Connected));
    assert_eq!(o.status(), Some(CallStatus::Connected));
    assert_eq!(snapshot(&o), before);
    assert!(o.call().unwrap().local().same_endpoint(&a));
    assert!(o.call().unwrap().peer().unwrap().same_endpoint(&b));
    assert_eq!(o.call().unwrap().initiator(), Role::A);
    assert!(!a.is_closed());
    assert!(!b.is_closed());
}

#[tokio::test]
async fn failed_answer_leaves_call_open_and_retry_reuses_the_offer() {
    let renderer = Arc::new(RecordingRenderer::new());
    let factory = Arc::new(FlakyFactory {
        failures: Arc::new(AtomicUsize::new(1)),
    });
    let logs = Arc::new(MemoryLogSink::new());
    let mut o =
        NegotiationOrchestrator::new(CallConfig::default(), factory, renderer, logs.clone());
    o.acquire_media(&SyntheticCapture::new(1, 1)).await.unwrap();

    let err = o.start_call(Role::A).await.unwrap_err();
    assert!(matches!(
        err,
        CallError::NegotiationFailed {
            step: NegotiationStep::CreateAnswer,
            role: Role::B,
            source: EndpointError::Engine(EngineError::Rejected(_)),
        }
    ));
    assert!(!err.ended_call());
    assert_eq!(o.status(), Some(CallStatus::NegotiationFailed));

    let call = o.call().unwrap();
    let a = call.endpoint(Role::A).unwrap().clone();
    let b = call.endpoint(Role::B).unwrap().clone();
    assert_eq!(a.state(), EndpointState::HaveLocalOffer);
    assert_eq!(b.state(), EndpointState::HaveRemoteOffer);
    let offer = a.local_description().unwrap();

    let status = o.retry_negotiation().await.unwrap();
    assert!(matches!(status, CallStatus::Negotiating | CallStatus::Connected));
    assert_eq!(a.local_description(), Some(offer));
    assert!(logs.contains(LogLevel::Info, "A reusing pending offer"));
    assert_eq!(o.wait_until_connected().await, Ok(CallStatus::Connected));

    // Nothing left to retry.
    assert_eq!(o.retry_negotiation().await, Ok(CallStatus::Connected));
}

#[tokio::test]
async fn end_call_is_idempotent_and_media_survives() {
    let (mut o, _, logs) = setup(CallConfig::default());
    o.acquire_media(&SyntheticCapture::new(1, 1)).await.unwrap();
    o.start_call(Role::A).await.unwrap();
    let endpoints: Vec<_> = o.call().unwrap().endpoints().into_iter().cloned().collect();

    o.end_call().await;
    assert_eq!(o.status(), None);
    assert!(endpoints.iter().all(|e| e.is_closed()));
    assert!(o.media().unwrap().is_live());
    assert!(o.media().unwrap().attached_roles().is_empty());
    assert!(logs.contains(LogLevel::Info, "Hanging up."));

    o.end_call().await;
    assert_eq!(o.status(), None);

    // A new call can start on the same capture.
    o.start_call(Role::B).await.unwrap();
    assert_eq!(o.call().unwrap().initiator(), Role::B);
    assert_eq!(o.wait_until_connected().await, Ok(CallStatus::Connected));
    o.end_call().await;

    o.release_media();
    assert_eq!(o.start_call(Role::A).await, Err(CallError::NoMediaSession));
}

#[tokio::test]
async fn closed_endpoint_ends_the_call() {
    let (mut o, _, _) = setup(CallConfig::default());
    o.acquire_media(&SyntheticCapture::new(1, 1)).await.unwrap();
    o.start_call(Role::A).await.unwrap();

    let b = o.call().unwrap().endpoint(Role::B).unwrap().clone();
    b.close();
    assert_eq!(o.refresh_status(), Some(CallStatus::Ended));
    assert_eq!(o.status(), None);
    assert!(o.call().is_none());
}

#[tokio::test]
async fn audio_only_capture_mutes_audio_but_not_video() {
    let config = CallConfig {
        constraints: MediaConstraints {
            audio: true,
            video: false,
        },
        ..CallConfig::default()
    };
    let (mut o, _, _) = setup(config);
    o.acquire_media(&SyntheticCapture::new(1, 0)).await.unwrap();

    let no_video = MediaError::NoTrackAvailable(MediaKind::Video);
    assert_eq!(o.toggle_video_mute(), Err(CallError::Media(no_video)));
    assert_eq!(o.toggle_audio_mute(), Ok(true));
    let media = o.media().unwrap();
    assert!(media.is_audio_muted());
    // The flag alone changes unless propagation is configured.
    assert!(media.stream().audio_tracks()[0].is_enabled());

    o.start_call(Role::A).await.unwrap();
    assert_eq!(o.wait_until_connected().await, Ok(CallStatus::Connected));
    assert_eq!(o.toggle_audio_mute(), Ok(false));
}

#[tokio::test]
async fn propagated_audio_mute_disables_the_track() {
    let config = CallConfig {
        propagate_audio_mute: true,
        ..CallConfig::default()
    };
    let (mut o, _, _) = setup(config);
    o.acquire_media(&SyntheticCapture::new(1, 1)).await.unwrap();

    assert_eq!(o.toggle_audio_mute(), Ok(true));
    assert!(!o.media().unwrap().stream().audio_tracks()[0].is_enabled());
    assert_eq!(o.toggle_video_mute(), Ok(true));
    assert!(!o.media().unwrap().stream().video_tracks()[0].is_enabled());
}
