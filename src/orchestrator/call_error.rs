use std::{fmt, time::Duration};

use crate::{
    endpoint::{EndpointError, Role},
    media::{DeviceError, MediaError},
    orchestrator::{call_status::CallStatus, negotiation_step::NegotiationStep},
    signaling::SignalingError,
    turn::ProvisionError,
};

/// Outcome of a failed orchestrator operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// `start_call` while a call exists; the existing call is untouched.
    CallActive(CallStatus),
    NoActiveCall,
    /// No captured stream to attach.
    NoMediaSession,
    Device(DeviceError),
    Media(MediaError),
    /// A step of the round failed. The call stays open unless `source` is
    /// `EndpointError::Closed`, in which case it has been torn down.
    NegotiationFailed {
        step: NegotiationStep,
        role: Role,
        source: EndpointError,
    },
    Signaling(SignalingError),
    /// A signaling message that makes no sense in the current state.
    UnexpectedMessage(&'static str),
    Provision(ProvisionError),
    ConnectTimeout(Duration),
}

impl CallError {
    /// The call no longer exists after this error.
    #[must_use]
    pub fn ended_call(&self) -> bool {
        matches!(
            self,
            Self::NegotiationFailed {
                source: EndpointError::Closed,
                ..
            }
        )
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CallActive(status) => write!(f, "a call is already active ({status})"),
            Self::NoActiveCall => write!(f, "no active call"),
            Self::NoMediaSession => write!(f, "no local stream captured"),
            Self::Device(e) => write!(f, "getUserMedia() error: {e}"),
            Self::Media(e) => write!(f, "{e}"),
            Self::NegotiationFailed { step, role, source } => {
                write!(f, "{role} {step} failed: {source}")
            }
            Self::Signaling(e) => write!(f, "{e}"),
            Self::UnexpectedMessage(what) => write!(f, "unexpected signaling message: {what}"),
            Self::Provision(e) => write!(f, "{e}"),
            Self::ConnectTimeout(d) => write!(f, "not connected after {d:?}"),
        }
    }
}

impl std::error::Error for CallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Device(e) => Some(e),
            Self::Media(e) => Some(e),
            Self::NegotiationFailed { source, .. } => Some(source),
            Self::Signaling(e) => Some(e),
            Self::Provision(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DeviceError> for CallError {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}

impl From<MediaError> for CallError {
    fn from(e: MediaError) -> Self {
        Self::Media(e)
    }
}

impl From<SignalingError> for CallError {
    fn from(e: SignalingError) -> Self {
        Self::Signaling(e)
    }
}

impl From<ProvisionError> for CallError {
    fn from(e: ProvisionError) -> Self {
        Self::Provision(e)
    }
}
