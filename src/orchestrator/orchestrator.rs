use std::{future::Future, sync::Arc};

use tokio::task::JoinHandle;

use crate::{
    endpoint::{
        Endpoint, EndpointError, EndpointState, IceCandidate, Role, SdpType, SessionDescription,
    },
    engine::{EngineFactory, LocalEngineFactory},
    log::LogSink,
    media::{MediaCapture, MediaSessionController},
    orchestrator::{
        call::{Call, PeerLink},
        call_config::CallConfig,
        call_error::CallError,
        call_status::CallStatus,
        negotiation_step::NegotiationStep,
    },
    relay::{CandidateRelay, RelayReport, RelayTarget},
    render::{RenderSurface, SurfaceId},
    signaling::{SignalingMessage, SignalingTransport},
    sink_debug, sink_error, sink_info, sink_warn,
    turn::{RelayCredentialProvider, provision_relay},
};

/// Drives one call at a time: media capture, the offer/answer round,
/// candidate relays, status tracking and teardown.
///
/// Without a signaling transport both endpoints live here (loopback). With
/// one, a single local endpoint talks to a remote orchestrator through
/// [`on_message`](Self::on_message).
///
/// Description setters are never exposed: every operation below runs its
/// steps strictly in order, and `&mut self` keeps any other operation from
/// observing a half-finished round.
pub struct NegotiationOrchestrator {
    config: CallConfig,
    factory: Arc<dyn EngineFactory>,
    renderer: Arc<dyn RenderSurface>,
    signaling: Option<Arc<dyn SignalingTransport>>,
    media: Option<MediaSessionController>,
    call: Option<Call>,
    logger: Arc<dyn LogSink>,
}

impl NegotiationOrchestrator {
    #[must_use]
    pub fn new(
        config: CallConfig,
        factory: Arc<dyn EngineFactory>,
        renderer: Arc<dyn RenderSurface>,
        logger: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            config,
            factory,
            renderer,
            signaling: None,
            media: None,
            call: None,
            logger,
        }
    }

    /// Orchestrator backed by [`LocalEngine`](crate::engine::LocalEngine)s
    /// using the configured offer options.
    #[must_use]
    pub fn local(
        config: CallConfig,
        renderer: Arc<dyn RenderSurface>,
        logger: Arc<dyn LogSink>,
    ) -> Self {
        let factory = Arc::new(LocalEngineFactory::new(config.offer));
        Self::new(config, factory, renderer, logger)
    }

    /// Talks to a remote peer through `transport` instead of running both
    /// endpoints locally.
    #[must_use]
    pub fn with_signaling(mut self, transport: Arc<dyn SignalingTransport>) -> Self {
        self.signaling = Some(transport);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &CallConfig {
        &self.config
    }

    #[must_use]
    pub const fn call(&self) -> Option<&Call> {
        self.call.as_ref()
    }

    /// `None` when there is no call.
    #[must_use]
    pub fn status(&self) -> Option<CallStatus> {
        self.call.as_ref().map(Call::status)
    }

    #[must_use]
    pub const fn media(&self) -> Option<&MediaSessionController> {
        self.media.as_ref()
    }

    pub fn media_mut(&mut self) -> Option<&mut MediaSessionController> {
        self.media.as_mut()
    }

    /// Adds a TURN relay from `[Turn] url` unless one is configured already.
    /// Only affects calls started afterwards.
    ///
    /// # Errors
    /// `Provision` on timeout, fetch failure or an unreadable response.
    pub async fn provision_turn(
        &mut self,
        provider: &dyn RelayCredentialProvider,
    ) -> Result<bool, CallError> {
        let Some(url) = self.config.turn_url.clone() else {
            return Ok(false);
        };
        Ok(provision_relay(
            &mut self.config.ice,
            provider,
            &url,
            self.config.turn_timeout,
            &self.logger,
        )
        .await?)
    }

    /// Captures the local stream and shows it on `localVideo`. A stream that
    /// is still live is reused.
    ///
    /// # Errors
    /// `Device` when capture fails.
    pub async fn acquire_media(&mut self, capture: &dyn MediaCapture) -> Result<(), CallError> {
        if self
            .media
            .as_ref()
            .is_some_and(MediaSessionController::is_live)
        {
            sink_debug!(self.logger, "Reusing live local stream");
            return Ok(());
        }
        let media = MediaSessionController::capture(
            capture,
            self.config.constraints,
            self.config.propagate_audio_mute,
            self.logger.clone(),
        )
        .await
        .inspect_err(|e| sink_error!(self.logger, "getUserMedia() error: {e}"))?;

        self.renderer.bind(SurfaceId::LocalVideo, media.stream());
        self.media = Some(media);
        Ok(())
    }

    /// # Errors
    /// `NoMediaSession` without a capture, `Media` without video tracks.
    pub fn toggle_video_mute(&mut self) -> Result<bool, CallError> {
        Ok(self
            .media
            .as_mut()
            .ok_or(CallError::NoMediaSession)?
            .toggle_video_mute()?)
    }

    /// # Errors
    /// `NoMediaSession` without a capture, `Media` without audio tracks.
    pub fn toggle_audio_mute(&mut self) -> Result<bool, CallError> {
        Ok(self
            .media
            .as_mut()
            .ok_or(CallError::NoMediaSession)?
            .toggle_audio_mute()?)
    }

    /// Stops the captured tracks. The next call needs a fresh capture.
    pub fn release_media(&mut self) {
        if let Some(mut media) = self.media.take() {
            media.release();
        }
    }

    /// Starts a call with `initiator` making the offer.
    ///
    /// In loopback the whole round runs here: offer, both descriptions,
    /// answer, both descriptions. In signaling mode the offer is sent and the
    /// round completes in [`on_answer_received`](Self::on_answer_received).
    ///
    /// # Errors
    /// `CallActive` if a call exists (it is left as is), `NoMediaSession`
    /// without a live capture, `NegotiationFailed` when a step fails.
    pub async fn start_call(&mut self, initiator: Role) -> Result<CallStatus, CallError> {
        if let Some(call) = &self.call {
            sink_warn!(self.logger, "Call already {}; start ignored", call.status());
            return Err(CallError::CallActive(call.status()));
        }
        if !self
            .media
            .as_ref()
            .is_some_and(MediaSessionController::is_live)
        {
            return Err(CallError::NoMediaSession);
        }

        sink_info!(self.logger, "Starting call");
        let local = self.new_endpoint(initiator);
        let call = match self.signaling.clone() {
            None => {
                let remote = self.new_endpoint(initiator.peer());
                if let Err(e) = self
                    .attach_media(&local)
                    .and_then(|()| self.attach_media(&remote))
                {
                    local.close();
                    remote.close();
                    return Err(e);
                }
                let link = PeerLink::Loopback(remote.clone());
                let mut call = Call::new(initiator, local.clone(), link);
                let forward = RelayTarget::Endpoint(remote.clone());
                call.relays.push(self.spawn_relay(local.clone(), forward));
                let back = RelayTarget::Endpoint(local);
                call.relays.push(self.spawn_relay(remote, back));
                call
            }
            Some(transport) => {
                if let Err(e) = self.attach_media(&local) {
                    local.close();
                    return Err(e);
                }
                let link = PeerLink::Signaling(transport.clone());
                let mut call = Call::new(initiator, local.clone(), link);
                let target = RelayTarget::Signaling(transport);
                call.relays.push(self.spawn_relay(local, target));
                call
            }
        };
        self.call = Some(call);
        self.run_round().await
    }

    /// Runs the round again after `NegotiationFailed`, resuming from the
    /// endpoints' current state. A pending local offer is reused rather
    /// than replaced. Any other status is returned unchanged.
    ///
    /// # Errors
    /// `NoActiveCall`, or the failure of the retried step.
    pub async fn retry_negotiation(&mut self) -> Result<CallStatus, CallError> {
        let status = self.status().ok_or(CallError::NoActiveCall)?;
        if status != CallStatus::NegotiationFailed {
            return Ok(status);
        }
        sink_info!(self.logger, "Retrying negotiation");
        self.run_round().await
    }

    /// Dispatches one raw signaling message.
    ///
    /// # Errors
    /// `Signaling` for undecodable text, otherwise whatever the handler for
    /// that kind of message reports.
    pub async fn on_message(&mut self, raw: &str) -> Result<(), CallError> {
        let message = SignalingMessage::decode(raw)?;
        sink_debug!(self.logger, "Client received message: {raw}");
        match message {
            SignalingMessage::Description(desc) if desc.sdp_type == SdpType::Offer => {
                self.on_offer_received(desc).await.map(|_| ())
            }
            SignalingMessage::Description(desc) => self.on_answer_received(desc).await.map(|_| ()),
            SignalingMessage::Candidate(candidate) => self.on_candidate_received(candidate).await,
            SignalingMessage::Bye => {
                self.on_remote_hangup();
                Ok(())
            }
        }
    }

    /// Responder side: applies the remote offer, answers, keeps the answer as
    /// the local description and sends it.
    ///
    /// # Errors
    /// `UnexpectedMessage` without signaling or while our own offer is
    /// pending, `NegotiationFailed` when a step fails.
    pub async fn on_offer_received(
        &mut self,
        offer: SessionDescription,
    ) -> Result<CallStatus, CallError> {
        let Some(transport) = self.signaling.clone() else {
            return Err(CallError::UnexpectedMessage(
                "offer without signaling transport",
            ));
        };
        if self.call.is_none() {
            let initiator = Role::A;
            let local = self.new_endpoint(initiator.peer());
            if self
                .media
                .as_ref()
                .is_some_and(MediaSessionController::is_live)
                && let Err(e) = self.attach_media(&local)
            {
                local.close();
                return Err(e);
            }
            let link = PeerLink::Signaling(transport.clone());
            let mut call = Call::new(initiator, local.clone(), link);
            let target = RelayTarget::Signaling(transport.clone());
            call.relays.push(self.spawn_relay(local, target));
            self.call = Some(call);
        }

        let local = self.local_endpoint()?;
        if local.state() == EndpointState::HaveLocalOffer {
            return Err(CallError::UnexpectedMessage(
                "offer while our own offer is pending",
            ));
        }
        let role = local.role();
        self.step(
            NegotiationStep::SetRemoteDescription,
            role,
            local.set_remote_description(&offer),
        )
        .await?;
        self.bind_remote(&local);
        self.answer_round(local, transport).await?;
        Ok(self.round_succeeded())
    }

    /// Initiator side in signaling mode: completes the round.
    ///
    /// # Errors
    /// `NoActiveCall`, `UnexpectedMessage` without a pending offer,
    /// `NegotiationFailed` when the description is refused.
    pub async fn on_answer_received(
        &mut self,
        answer: SessionDescription,
    ) -> Result<CallStatus, CallError> {
        let local = self.local_endpoint()?;
        if self.call.as_ref().and_then(Call::peer).is_some() {
            return Err(CallError::UnexpectedMessage("answer in loopback mode"));
        }
        if local.state() != EndpointState::HaveLocalOffer {
            return Err(CallError::UnexpectedMessage(
                "answer without a pending offer",
            ));
        }
        self.step(
            NegotiationStep::SetRemoteDescription,
            local.role(),
            local.set_remote_description(&answer),
        )
        .await?;
        self.bind_remote(&local);
        Ok(self.round_succeeded())
    }

    /// Hands a remote candidate to the local endpoint, which buffers it if
    /// the remote description has not landed yet. A rejected candidate is
    /// reported but leaves the call status alone.
    ///
    /// A candidate with no call to go to (the peer's relay still had some in
    /// flight when we hung up) is dropped.
    ///
    /// # Errors
    /// `NegotiationFailed` with step `AddIceCandidate`.
    pub async fn on_candidate_received(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<(), CallError> {
        let Ok(local) = self.local_endpoint() else {
            sink_warn!(self.logger, "Dropping ICE candidate without a call: {candidate}");
            return Ok(());
        };
        let role = local.role();
        match local.add_ice_candidate(candidate).await {
            Ok(_) => {
                self.refresh_status();
                Ok(())
            }
            Err(EndpointError::Closed) => Err(self.failed(
                NegotiationStep::AddIceCandidate,
                role,
                EndpointError::Closed,
            )),
            Err(source) => Err(CallError::NegotiationFailed {
                step: NegotiationStep::AddIceCandidate,
                role,
                source,
            }),
        }
    }

    /// Hangs up: tells the remote side (signaling mode), closes both
    /// endpoints, stops the relays and detaches the media. The capture
    /// stays live for the next call. Calling it again does nothing.
    pub async fn end_call(&mut self) {
        let Some(transport) = self.call.as_ref().map(Call::transport) else {
            return;
        };
        sink_info!(self.logger, "Hanging up.");
        if let Some(transport) = transport {
            let sent = match SignalingMessage::Bye.encode() {
                Ok(wire) => transport.send(wire).await,
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                sink_warn!(self.logger, "bye not sent: {e}");
            }
        }
        self.shut_down_call();
        sink_info!(self.logger, "Session terminated.");
    }

    /// Promotes `Negotiating` to `Connected` once every endpoint is
    /// connected. A call whose endpoint was closed underneath is torn down
    /// and reported as `Ended`.
    pub fn refresh_status(&mut self) -> Option<CallStatus> {
        let call = self.call.as_mut()?;
        if call.endpoints().iter().any(|e| e.is_closed()) {
            sink_warn!(self.logger, "Endpoint closed underneath the call");
            self.shut_down_call();
            return Some(CallStatus::Ended);
        }
        if call.status == CallStatus::Negotiating && call.all_connected() {
            call.status = CallStatus::Connected;
            sink_info!(self.logger, "Call connected");
        }
        Some(call.status)
    }

    /// Waits until every endpoint of the call is connected.
    ///
    /// In signaling mode remote candidates only arrive through
    /// [`on_message`](Self::on_message), so poll
    /// [`refresh_status`](Self::refresh_status) there instead.
    ///
    /// # Errors
    /// `ConnectTimeout` after `[Call] connect_timeout_ms`;
    /// `NegotiationFailed` with step `Connect` if an endpoint closed.
    pub async fn wait_until_connected(&mut self) -> Result<CallStatus, CallError> {
        let endpoints: Vec<Endpoint> = self
            .call
            .as_ref()
            .ok_or(CallError::NoActiveCall)?
            .endpoints()
            .into_iter()
            .cloned()
            .collect();
        let limit = self.config.connect_timeout;

        let waited = tokio::time::timeout(limit, async {
            for e in &endpoints {
                e.wait_connected().await.map_err(|err| (e.role(), err))?;
            }
            Ok::<(), (Role, EndpointError)>(())
        })
        .await;

        match waited {
            Err(_) => {
                sink_warn!(self.logger, "Not connected after {limit:?}");
                Err(CallError::ConnectTimeout(limit))
            }
            Ok(Err((role, source))) => Err(self.failed(NegotiationStep::Connect, role, source)),
            Ok(Ok(())) => Ok(self.refresh_status().unwrap_or(CallStatus::Ended)),
        }
    }

    async fn run_round(&mut self) -> Result<CallStatus, CallError> {
        let call = self.call.as_ref().ok_or(CallError::NoActiveCall)?;
        let local = call.local().clone();
        let initiator = call.initiator();
        let peer = call.peer().cloned();
        let transport = call.transport();
        match (peer, transport) {
            (Some(remote), _) => self.loopback_round(local, remote).await?,
            (None, Some(transport)) if local.role() == initiator => {
                self.offer_round(local, transport).await?;
            }
            (None, Some(transport)) => self.answer_round(local, transport).await?,
            (None, None) => return Err(CallError::NoActiveCall),
        }
        Ok(self.round_succeeded())
    }

    async fn loopback_round(
        &mut self,
        local: Endpoint,
        remote: Endpoint,
    ) -> Result<(), CallError> {
        let offer = self.pending_or_new_offer(&local).await?;
        if remote.remote_description().as_ref() != Some(&offer) {
            self.step(
                NegotiationStep::SetRemoteDescription,
                remote.role(),
                remote.set_remote_description(&offer),
            )
            .await?;
        }
        self.bind_remote(&remote);

        let answer = match remote.local_description() {
            Some(a) if remote.state().is_negotiated() => a,
            _ => {
                let a = self
                    .step(
                        NegotiationStep::CreateAnswer,
                        remote.role(),
                        remote.create_answer(),
                    )
                    .await?;
                self.step(
                    NegotiationStep::SetLocalDescription,
                    remote.role(),
                    remote.set_local_description(&a),
                )
                .await?;
                a
            }
        };
        if local.remote_description().as_ref() != Some(&answer) {
            self.step(
                NegotiationStep::SetRemoteDescription,
                local.role(),
                local.set_remote_description(&answer),
            )
            .await?;
        }
        Ok(())
    }

    async fn offer_round(
        &mut self,
        local: Endpoint,
        transport: Arc<dyn SignalingTransport>,
    ) -> Result<(), CallError> {
        let offer = self.pending_or_new_offer(&local).await?;
        self.signal(&transport, SignalingMessage::Description(offer))
            .await
    }

    async fn answer_round(
        &mut self,
        local: Endpoint,
        transport: Arc<dyn SignalingTransport>,
    ) -> Result<(), CallError> {
        let role = local.role();
        let answer = if local.state() == EndpointState::HaveRemoteOffer {
            let a = self
                .step(NegotiationStep::CreateAnswer, role, local.create_answer())
                .await?;
            self.step(
                NegotiationStep::SetLocalDescription,
                role,
                local.set_local_description(&a),
            )
            .await?;
            a
        } else if let Some(a) = local
            .local_description()
            .filter(|d| d.sdp_type == SdpType::Answer)
        {
            // Failed to send last time; the answer itself is already set.
            a
        } else {
            return Err(CallError::UnexpectedMessage("no remote offer to answer"));
        };
        self.signal(&transport, SignalingMessage::Description(answer))
            .await
    }

    async fn pending_or_new_offer(
        &mut self,
        local: &Endpoint,
    ) -> Result<SessionDescription, CallError> {
        let role = local.role();
        if local.state() == EndpointState::HaveLocalOffer
            && let Some(pending) = local.local_description()
        {
            sink_info!(self.logger, "{role} reusing pending offer");
            return Ok(pending);
        }
        let offer = self
            .step(NegotiationStep::CreateOffer, role, local.create_offer())
            .await?;
        self.step(
            NegotiationStep::SetLocalDescription,
            role,
            local.set_local_description(&offer),
        )
        .await?;
        Ok(offer)
    }

    /// Awaits one endpoint step and turns its failure into a call outcome.
    async fn step<T>(
        &mut self,
        step: NegotiationStep,
        role: Role,
        fut: impl Future<Output = Result<T, EndpointError>>,
    ) -> Result<T, CallError> {
        match fut.await {
            Ok(v) => Ok(v),
            Err(source) => Err(self.failed(step, role, source)),
        }
    }

    /// A closed endpoint ends the call; anything else leaves it open in
    /// `NegotiationFailed` for the caller to retry or hang up.
    fn failed(&mut self, step: NegotiationStep, role: Role, source: EndpointError) -> CallError {
        sink_error!(self.logger, "Failed to {step} on {role}: {source}");
        if source == EndpointError::Closed {
            self.shut_down_call();
        } else if let Some(call) = self.call.as_mut() {
            call.status = CallStatus::NegotiationFailed;
        }
        CallError::NegotiationFailed { step, role, source }
    }

    async fn signal(
        &mut self,
        transport: &Arc<dyn SignalingTransport>,
        message: SignalingMessage,
    ) -> Result<(), CallError> {
        let sent = match message.encode() {
            Ok(wire) => transport.send(wire).await,
            Err(e) => Err(e),
        };
        sent.map_err(|e| {
            sink_error!(self.logger, "Failed to send signaling message: {e}");
            if let Some(call) = self.call.as_mut() {
                call.status = CallStatus::NegotiationFailed;
            }
            CallError::Signaling(e)
        })
    }

    fn round_succeeded(&mut self) -> CallStatus {
        if let Some(call) = self.call.as_mut()
            && call.status == CallStatus::NegotiationFailed
        {
            call.status = CallStatus::Negotiating;
        }
        self.refresh_status().unwrap_or(CallStatus::Ended)
    }

    fn bind_remote(&mut self, from: &Endpoint) {
        let Some(call) = self.call.as_mut() else {
            return;
        };
        if call.remote_bound {
            return;
        }
        if let Some(stream) = from.remote_stream() {
            sink_info!(self.logger, "{} received remote stream", from.role());
            self.renderer.bind(SurfaceId::RemoteVideo, &stream);
            call.remote_bound = true;
        }
    }

    fn local_endpoint(&self) -> Result<Endpoint, CallError> {
        self.call
            .as_ref()
            .map(|c| c.local().clone())
            .ok_or(CallError::NoActiveCall)
    }

    fn on_remote_hangup(&mut self) {
        if self.call.is_some() {
            sink_info!(self.logger, "Session terminated.");
            self.shut_down_call();
        }
    }

    fn shut_down_call(&mut self) {
        if let Some(mut call) = self.call.take() {
            call.shut_down();
        }
        if let Some(media) = self.media.as_mut() {
            media.detach_all();
        }
    }

    fn new_endpoint(&self, role: Role) -> Endpoint {
        sink_debug!(self.logger, "Created local peer connection object {role}");
        Endpoint::new(
            role,
            self.factory.create(role, &self.config.ice),
            self.logger.clone(),
        )
    }

    fn attach_media(&mut self, endpoint: &Endpoint) -> Result<(), CallError> {
        let media = self.media.as_mut().ok_or(CallError::NoMediaSession)?;
        media.attach(endpoint)?;
        Ok(())
    }

    fn spawn_relay(&self, source: Endpoint, target: RelayTarget) -> JoinHandle<RelayReport> {
        let relay = CandidateRelay::new(source, target, self.logger.clone());
        tokio::spawn(relay.run())
    }
}
