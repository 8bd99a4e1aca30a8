use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{MutexGuard, Notify, watch};

use crate::{
    endpoint::{
        endpoint_error::{DescriptionSlot, EndpointError},
        endpoint_state::EndpointState,
        ice_candidate::IceCandidate,
        role::Role,
        session_description::{SdpType, SessionDescription},
    },
    engine::PeerEngine,
    log::LogSink,
    media::MediaStream,
    sink_debug, sink_info, sink_warn,
};

/// What `add_ice_candidate` did with the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOutcome {
    Applied,
    /// Held until the remote description lands.
    Queued,
}

#[derive(Debug)]
struct Slots {
    state: EndpointState,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    /// Remote candidates received before the remote description, in arrival order.
    pending: VecDeque<IceCandidate>,
    applied: Vec<IceCandidate>,
    remote_candidates_applied: usize,
    /// Local candidates waiting for the relay.
    outgoing: VecDeque<IceCandidate>,
    gathering_started: bool,
    local_stream: Option<MediaStream>,
    remote_stream: Option<MediaStream>,
}

impl Slots {
    const fn new() -> Self {
        Self {
            state: EndpointState::New,
            local: None,
            remote: None,
            pending: VecDeque::new(),
            applied: Vec::new(),
            remote_candidates_applied: 0,
            outgoing: VecDeque::new(),
            gathering_started: false,
            local_stream: None,
            remote_stream: None,
        }
    }

    /// Negotiated plus one usable remote path means media can flow.
    fn settle_connected(&mut self) {
        if self.state == EndpointState::Negotiating && self.remote_candidates_applied > 0 {
            self.state = EndpointState::Connected;
        }
    }
}

struct Inner {
    role: Role,
    slots: Mutex<Slots>,
    /// Serializes every engine step; tokio's mutex is FIFO, which keeps
    /// candidate additions in submission order.
    engine: tokio::sync::Mutex<Box<dyn PeerEngine>>,
    state_tx: watch::Sender<EndpointState>,
    outgoing_ready: Notify,
    logger: Arc<dyn LogSink>,
}

enum Plan {
    Apply(EndpointState),
    AlreadySet,
}

/// One side of a call.
///
/// Cloning yields another handle to the same endpoint. All negotiation steps
/// are async and run one at a time; `close` is synchronous and may be called
/// from anywhere, at any time.
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<Inner>,
}

impl Endpoint {
    #[must_use]
    pub fn new(role: Role, engine: Box<dyn PeerEngine>, logger: Arc<dyn LogSink>) -> Self {
        let (state_tx, _) = watch::channel(EndpointState::New);
        Self {
            inner: Arc::new(Inner {
                role,
                slots: Mutex::new(Slots::new()),
                engine: tokio::sync::Mutex::new(engine),
                state_tx,
                outgoing_ready: Notify::new(),
                logger,
            }),
        }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.inner.role
    }

    #[must_use]
    pub fn state(&self) -> EndpointState {
        self.with_slots(|s| s.state)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == EndpointState::Closed
    }

    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<EndpointState> {
        self.inner.state_tx.subscribe()
    }

    /// True if both handles point at the same endpoint.
    #[must_use]
    pub fn same_endpoint(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn local_description(&self) -> Option<SessionDescription> {
        self.with_slots(|s| s.local.clone())
    }

    #[must_use]
    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.with_slots(|s| s.remote.clone())
    }

    /// Remote candidates handed to the engine, in the order they were applied.
    #[must_use]
    pub fn applied_candidates(&self) -> Vec<IceCandidate> {
        self.with_slots(|s| s.applied.clone())
    }

    #[must_use]
    pub fn pending_candidates(&self) -> usize {
        self.with_slots(|s| s.pending.len())
    }

    #[must_use]
    pub fn local_stream(&self) -> Option<MediaStream> {
        self.with_slots(|s| s.local_stream.clone())
    }

    /// Stream announced by the remote description, if any.
    #[must_use]
    pub fn remote_stream(&self) -> Option<MediaStream> {
        self.with_slots(|s| s.remote_stream.clone())
    }

    /// Holds a view of `stream` for the following offers/answers.
    /// Returns false if the endpoint is closed.
    pub fn attach_stream(&self, stream: MediaStream) -> bool {
        self.with_slots(|s| {
            if s.state == EndpointState::Closed {
                return false;
            }
            s.local_stream = Some(stream);
            true
        })
    }

    pub fn detach_stream(&self) {
        self.with_slots(|s| s.local_stream = None);
    }

    /// Takes every local candidate gathered since the last call, in
    /// discovery order. `EndOfCandidates` comes last.
    #[must_use]
    pub fn flush_outgoing_candidates(&self) -> Vec<IceCandidate> {
        self.with_slots(|s| s.outgoing.drain(..).collect())
    }

    /// Resolves once new local candidates are queued or the endpoint closes.
    pub async fn candidates_available(&self) {
        self.inner.outgoing_ready.notified().await;
    }

    /// Waits for `Connected`.
    ///
    /// # Errors
    /// `Closed` if the endpoint closes first.
    pub async fn wait_connected(&self) -> Result<(), EndpointError> {
        let mut rx = self.subscribe_state();
        let reached = rx
            .wait_for(|s| matches!(s, EndpointState::Connected | EndpointState::Closed))
            .await
            .map(|s| *s);
        match reached {
            Ok(EndpointState::Connected) => Ok(()),
            _ => Err(EndpointError::Closed),
        }
    }

    /// # Errors
    /// `OfferPending` while a local offer waits for its answer,
    /// `InvalidState` while a remote offer is waiting to be answered,
    /// `Engine` if the backend fails, `Closed` if closed meanwhile.
    pub async fn create_offer(&self) -> Result<SessionDescription, EndpointError> {
        let role = self.role();
        let mut engine = self.lock_engine().await?;
        match self.state() {
            EndpointState::HaveLocalOffer => return Err(EndpointError::OfferPending),
            EndpointState::HaveRemoteOffer => {
                return Err(EndpointError::InvalidState {
                    operation: "create_offer",
                    state: EndpointState::HaveRemoteOffer,
                });
            }
            _ => {}
        }

        sink_info!(self.inner.logger, "{role} createOffer start");
        let local = self.local_stream();
        let result = engine.create_offer(local.as_ref()).await;
        self.check_open(&mut engine)?;
        let sdp = result.map_err(|e| self.failed("createOffer", e.into()))?;
        sink_info!(self.inner.logger, "Offer from {role}\n{sdp}");
        Ok(SessionDescription::offer(sdp))
    }

    /// # Errors
    /// `InvalidState` unless a remote offer has been set, `Engine` if the
    /// backend fails, `Closed` if closed meanwhile.
    pub async fn create_answer(&self) -> Result<SessionDescription, EndpointError> {
        let role = self.role();
        let mut engine = self.lock_engine().await?;
        let state = self.state();
        if state != EndpointState::HaveRemoteOffer {
            return Err(EndpointError::InvalidState {
                operation: "create_answer",
                state,
            });
        }

        sink_info!(self.inner.logger, "{role} createAnswer start");
        let local = self.local_stream();
        let result = engine.create_answer(local.as_ref()).await;
        self.check_open(&mut engine)?;
        let sdp = result.map_err(|e| self.failed("createAnswer", e.into()))?;
        sink_info!(self.inner.logger, "Answer from {role}\n{sdp}");
        Ok(SessionDescription::answer(sdp))
    }

    /// Sets the local description and starts gathering the first time.
    ///
    /// # Errors
    /// `DescriptionConflict` if a different (or already finalized)
    /// description occupies the slot, `UnexpectedType` for an out-of-order
    /// type, `Engine` if the backend refuses it, `Closed` if closed meanwhile.
    pub async fn set_local_description(
        &self,
        desc: &SessionDescription,
    ) -> Result<(), EndpointError> {
        let role = self.role();
        let mut engine = self.lock_engine().await?;
        let slot = DescriptionSlot::Local;
        let next = match self.with_slots(|s| plan(slot, s.state, s.local.as_ref(), desc))? {
            Plan::AlreadySet => return Ok(()),
            Plan::Apply(next) => next,
        };

        sink_info!(self.inner.logger, "{role} setLocalDescription start");
        let result = engine.apply_local_description(desc).await;
        self.check_open(&mut engine)?;
        result.map_err(|e| self.failed("setLocalDescription", e.into()))?;

        let start_gathering = self.commit(|s| {
            s.local = Some(desc.clone());
            s.state = next;
            s.settle_connected();
            !std::mem::replace(&mut s.gathering_started, true)
        })?;
        sink_info!(self.inner.logger, "{role} setLocalDescription complete");

        if start_gathering {
            self.gather(&mut engine).await?;
        }
        Ok(())
    }

    /// Sets the remote description, then replays candidates that arrived
    /// early, in arrival order. A replayed candidate the engine rejects is
    /// logged and dropped; it does not fail this call.
    ///
    /// # Errors
    /// Same classes as [`set_local_description`](Self::set_local_description).
    pub async fn set_remote_description(
        &self,
        desc: &SessionDescription,
    ) -> Result<(), EndpointError> {
        let role = self.role();
        let mut engine = self.lock_engine().await?;
        let slot = DescriptionSlot::Remote;
        let next = match self.with_slots(|s| plan(slot, s.state, s.remote.as_ref(), desc))? {
            Plan::AlreadySet => return Ok(()),
            Plan::Apply(next) => next,
        };

        sink_info!(self.inner.logger, "{role} setRemoteDescription start");
        let result = engine.apply_remote_description(desc).await;
        self.check_open(&mut engine)?;
        let remote_stream = result.map_err(|e| self.failed("setRemoteDescription", e.into()))?;

        self.commit(|s| {
            s.remote = Some(desc.clone());
            if remote_stream.is_some() {
                s.remote_stream = remote_stream;
            }
            s.state = next;
            s.settle_connected();
        })?;
        sink_info!(self.inner.logger, "{role} setRemoteDescription complete");

        while let Some(candidate) = self.with_slots(|s| s.pending.pop_front()) {
            sink_debug!(self.inner.logger, "{role} replaying queued candidate {candidate}");
            if let Err(e) = self.apply_candidate(&mut engine, candidate).await {
                if e == EndpointError::Closed {
                    return Err(e);
                }
                sink_warn!(self.inner.logger, "{role} failed to add ICE candidate: {e}");
            }
        }
        Ok(())
    }

    /// Applies a remote candidate, or queues it when no remote description
    /// is set yet.
    ///
    /// # Errors
    /// `Engine` when the engine rejects the candidate, `Closed` if closed.
    pub async fn add_ice_candidate(
        &self,
        candidate: IceCandidate,
    ) -> Result<CandidateOutcome, EndpointError> {
        let role = self.role();
        let mut engine = self.lock_engine().await?;
        let queued = self.with_slots(|s| {
            if s.remote.is_some() {
                return false;
            }
            s.pending.push_back(candidate.clone());
            true
        });
        if queued {
            sink_debug!(
                self.inner.logger,
                "{role} queued ICE candidate until remote description ({} pending)",
                self.pending_candidates()
            );
            return Ok(CandidateOutcome::Queued);
        }

        self.apply_candidate(&mut engine, candidate)
            .await
            .inspect_err(|e| {
                if *e != EndpointError::Closed {
                    sink_warn!(self.inner.logger, "{role} failed to add ICE candidate: {e}");
                }
            })?;
        Ok(CandidateOutcome::Applied)
    }

    /// Releases everything. Idempotent, never fails. An engine step still in
    /// flight finishes as a no-op returning `Closed`.
    pub fn close(&self) {
        let was_open = self.with_slots(|s| {
            if s.state == EndpointState::Closed {
                return false;
            }
            s.state = EndpointState::Closed;
            s.pending.clear();
            s.outgoing.clear();
            s.local_stream = None;
            s.remote_stream = None;
            true
        });
        if !was_open {
            return;
        }
        self.inner.state_tx.send_replace(EndpointState::Closed);
        // Wakes the relay so it can notice and exit.
        self.inner.outgoing_ready.notify_one();
        // Busy means a step is in flight; it closes the engine when it resumes.
        if let Ok(mut engine) = self.inner.engine.try_lock() {
            engine.close();
        }
        sink_info!(self.inner.logger, "{} closed", self.role());
    }

    async fn apply_candidate(
        &self,
        engine: &mut MutexGuard<'_, Box<dyn PeerEngine>>,
        candidate: IceCandidate,
    ) -> Result<(), EndpointError> {
        let result = engine.add_remote_candidate(&candidate).await;
        self.check_open(engine)?;
        result?;
        sink_debug!(self.inner.logger, "{} addIceCandidate success", self.role());
        self.commit(|s| {
            if !candidate.is_end_of_candidates() {
                s.remote_candidates_applied += 1;
            }
            s.applied.push(candidate);
            s.settle_connected();
        })
    }

    async fn gather(
        &self,
        engine: &mut MutexGuard<'_, Box<dyn PeerEngine>>,
    ) -> Result<(), EndpointError> {
        let role = self.role();
        let result = engine.gather_candidates().await;
        self.check_open(engine)?;
        let mut found = result.unwrap_or_else(|e| {
            sink_warn!(self.inner.logger, "{role} candidate gathering failed: {e}");
            Vec::new()
        });
        for c in &found {
            sink_info!(self.inner.logger, "{role} ICE candidate: \n{c}");
        }
        found.push(IceCandidate::EndOfCandidates);
        self.commit(|s| s.outgoing.extend(found))?;
        self.inner.outgoing_ready.notify_one();
        Ok(())
    }

    async fn lock_engine(&self) -> Result<MutexGuard<'_, Box<dyn PeerEngine>>, EndpointError> {
        let mut engine = self.inner.engine.lock().await;
        self.check_open(&mut engine)?;
        Ok(engine)
    }

    /// Called after every await on the engine: a close that happened
    /// meanwhile turns the step into a no-op.
    fn check_open(
        &self,
        engine: &mut MutexGuard<'_, Box<dyn PeerEngine>>,
    ) -> Result<(), EndpointError> {
        if self.is_closed() {
            engine.close();
            return Err(EndpointError::Closed);
        }
        Ok(())
    }

    /// Applies `f` unless the endpoint closed, then publishes the state.
    fn commit<R>(&self, f: impl FnOnce(&mut Slots) -> R) -> Result<R, EndpointError> {
        let (out, state) = self.with_slots(|s| {
            if s.state == EndpointState::Closed {
                return None;
            }
            let out = f(s);
            Some((out, s.state))
        })
        .ok_or(EndpointError::Closed)?;
        self.inner.state_tx.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
        Ok(out)
    }

    fn failed(&self, step: &str, e: EndpointError) -> EndpointError {
        sink_warn!(self.inner.logger, "{} {step} failed: {e}", self.role());
        e
    }

    fn with_slots<R>(&self, f: impl FnOnce(&mut Slots) -> R) -> R {
        let mut slots = self
            .inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut slots)
    }
}

/// Decides what setting `desc` into `slot` does from `state`.
fn plan(
    slot: DescriptionSlot,
    state: EndpointState,
    current: Option<&SessionDescription>,
    desc: &SessionDescription,
) -> Result<Plan, EndpointError> {
    use EndpointState::{Closed, Connected, HaveLocalOffer, HaveRemoteOffer, Negotiating, New};

    let (own_offer, peer_offer) = match slot {
        DescriptionSlot::Local => (HaveLocalOffer, HaveRemoteOffer),
        DescriptionSlot::Remote => (HaveRemoteOffer, HaveLocalOffer),
    };
    let same = current == Some(desc);

    match (desc.sdp_type, state) {
        (_, Closed) => Err(EndpointError::Closed),
        (SdpType::Offer, New) => Ok(Plan::Apply(own_offer)),
        (SdpType::Offer, s) if s == own_offer => {
            if same {
                Ok(Plan::AlreadySet)
            } else {
                Err(EndpointError::DescriptionConflict(slot))
            }
        }
        // A different offer after a finished round starts the next one.
        (SdpType::Offer, Negotiating | Connected) if !same => Ok(Plan::Apply(own_offer)),
        (SdpType::Answer, s) if s == peer_offer => Ok(Plan::Apply(Negotiating)),
        (_, Negotiating | Connected) => Err(EndpointError::DescriptionConflict(slot)),
        (sdp_type, state) => Err(EndpointError::UnexpectedType {
            slot,
            sdp_type,
            state,
        }),
    }
}
