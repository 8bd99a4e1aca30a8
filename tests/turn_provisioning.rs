#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use peercall::{
    endpoint::{IceCandidate, Role},
    log::{LogLevel, MemoryLogSink},
    media::SyntheticCapture,
    orchestrator::{CallConfig, CallError, CallStatus, NegotiationOrchestrator},
    render::RecordingRenderer,
    turn::{ProvisionError, RelayCredentialProvider},
};

enum Service {
    Answers(&'static str),
    Hangs,
    Fails,
}

#[async_trait]
impl RelayCredentialProvider for Service {
    async fn fetch_relay_credentials(&self, _url: &str) -> Result<String, ProvisionError> {
        match self {
            Self::Answers(body) => Ok((*body).to_string()),
            Self::Hangs => std::future::pending().await,
            Self::Fails => Err(ProvisionError::Fetch("503".into())),
        }
    }
}

fn orchestrator(turn_url: Option<&str>) -> (NegotiationOrchestrator, Arc<MemoryLogSink>) {
    let config = CallConfig {
        turn_url: turn_url.map(str::to_string),
        turn_timeout: Duration::from_millis(50),
        ..CallConfig::default()
    };
    let logs = Arc::new(MemoryLogSink::new());
    let renderer = Arc::new(RecordingRenderer::new());
    let o = NegotiationOrchestrator::local(config, renderer, logs.clone());
    (o, logs)
}

#[tokio::test]
async fn provisioned_relay_shows_up_in_gathered_candidates() {
    let (mut o, logs) = orchestrator(Some("https://turn.example/turn"));
    let service = Service::Answers(
        r#"{"username":"1700000000:x","password":"secret","turn":"127.0.0.1:3478"}"#,
    );
    assert_eq!(o.provision_turn(&service).await, Ok(true));
    assert!(o.config().ice.has_turn());
    assert!(logs.contains(
        LogLevel::Info,
        "Got TURN server: turn:1700000000:x@127.0.0.1:3478"
    ));

    // Already configured: nothing is fetched again.
    assert_eq!(o.provision_turn(&Service::Fails).await, Ok(false));
    assert_eq!(o.config().ice.servers.len(), 1);

    o.acquire_media(&SyntheticCapture::new(1, 1)).await.unwrap();
    o.start_call(Role::A).await.unwrap();
    assert_eq!(o.wait_until_connected().await, Ok(CallStatus::Connected));
    let b = o.call().unwrap().endpoint(Role::B).unwrap().clone();
    for _ in 0..100 {
        let applied = b.applied_candidates();
        if applied.contains(&IceCandidate::EndOfCandidates) {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(b.applied_candidates().iter().any(|c| match c {
        IceCandidate::Candidate(init) => init.candidate.contains("typ relay"),
        IceCandidate::EndOfCandidates => false,
    }));
}

#[tokio::test]
async fn slow_or_broken_services_leave_ice_untouched() {
    let (mut o, _) = orchestrator(Some("https://turn.example/turn"));
    let timeout = ProvisionError::Timeout(Duration::from_millis(50));
    assert_eq!(
        o.provision_turn(&Service::Hangs).await,
        Err(CallError::Provision(timeout))
    );
    assert_eq!(
        o.provision_turn(&Service::Fails).await,
        Err(CallError::Provision(ProvisionError::Fetch("503".into())))
    );
    assert!(matches!(
        o.provision_turn(&Service::Answers("not json")).await,
        Err(CallError::Provision(ProvisionError::Malformed(_)))
    ));
    assert!(o.config().ice.servers.is_empty());
}

#[tokio::test]
async fn no_service_configured_means_no_request() {
    let (mut o, _) = orchestrator(None);
    assert_eq!(o.provision_turn(&Service::Hangs).await, Ok(false));
}
