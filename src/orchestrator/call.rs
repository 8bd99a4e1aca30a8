use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    endpoint::{Endpoint, EndpointState, Role},
    orchestrator::call_status::CallStatus,
    relay::RelayReport,
    signaling::SignalingTransport,
};

/// How the call reaches the other side.
#[derive(Clone)]
pub enum PeerLink {
    /// Both endpoints live in this process.
    Loopback(Endpoint),
    /// The other endpoint is remote, behind signaling.
    Signaling(Arc<dyn SignalingTransport>),
}

/// The aggregate for one call. Only the orchestrator mutates it.
pub struct Call {
    initiator: Role,
    local: Endpoint,
    peer: PeerLink,
    pub(crate) status: CallStatus,
    pub(crate) relays: Vec<JoinHandle<RelayReport>>,
    pub(crate) remote_bound: bool,
}

impl Call {
    pub(crate) fn new(initiator: Role, local: Endpoint, peer: PeerLink) -> Self {
        Self {
            initiator,
            local,
            peer,
            status: CallStatus::Negotiating,
            relays: Vec::new(),
            remote_bound: false,
        }
    }

    #[must_use]
    pub const fn status(&self) -> CallStatus {
        self.status
    }

    #[must_use]
    pub const fn initiator(&self) -> Role {
        self.initiator
    }

    /// The endpoint this process drives first: the initiator in loopback,
    /// the only one in signaling mode.
    #[must_use]
    pub const fn local(&self) -> &Endpoint {
        &self.local
    }

    /// The in-process peer, when there is one.
    #[must_use]
    pub const fn peer(&self) -> Option<&Endpoint> {
        match &self.peer {
            PeerLink::Loopback(e) => Some(e),
            PeerLink::Signaling(_) => None,
        }
    }

    #[must_use]
    pub fn transport(&self) -> Option<Arc<dyn SignalingTransport>> {
        match &self.peer {
            PeerLink::Loopback(_) => None,
            PeerLink::Signaling(t) => Some(t.clone()),
        }
    }

    #[must_use]
    pub fn endpoint(&self, role: Role) -> Option<&Endpoint> {
        self.endpoints().into_iter().find(|e| e.role() == role)
    }

    #[must_use]
    pub fn endpoints(&self) -> Vec<&Endpoint> {
        std::iter::once(&self.local).chain(self.peer()).collect()
    }

    pub(crate) fn all_connected(&self) -> bool {
        self.endpoints()
            .iter()
            .all(|e| e.state() == EndpointState::Connected)
    }

    /// Closes every endpoint and stops the relays.
    pub(crate) fn shut_down(&mut self) {
        for e in self.endpoints() {
            e.close();
        }
        for relay in self.relays.drain(..) {
            relay.abort();
        }
        self.status = CallStatus::Ended;
    }
}
