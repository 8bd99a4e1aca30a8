use serde::{Deserialize, Serialize};

use crate::{
    endpoint::{CandidateInit, IceCandidate, SdpType, SessionDescription},
    signaling::signaling_error::SignalingError,
};

/// Hangup sentinel. Sent as bare text, not JSON.
const BYE: &str = "bye";

/// What travels over a [`SignalingTransport`](crate::signaling::SignalingTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingMessage {
    Description(SessionDescription),
    Candidate(IceCandidate),
    Bye,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum Envelope {
    Offer {
        sdp: String,
    },
    Answer {
        sdp: String,
    },
    Candidate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        candidate: String,
    },
    EndOfCandidates,
}

impl SignalingMessage {
    /// # Errors
    /// `Encode` if serialization fails.
    pub fn encode(&self) -> Result<String, SignalingError> {
        let envelope = match self {
            Self::Bye => return Ok(BYE.to_string()),
            Self::Description(desc) => match desc.sdp_type {
                SdpType::Offer => Envelope::Offer {
                    sdp: desc.sdp.clone(),
                },
                SdpType::Answer => Envelope::Answer {
                    sdp: desc.sdp.clone(),
                },
            },
            Self::Candidate(IceCandidate::EndOfCandidates) => Envelope::EndOfCandidates,
            Self::Candidate(IceCandidate::Candidate(init)) => Envelope::Candidate {
                label: init.sdp_mline_index,
                id: init.sdp_mid.clone(),
                candidate: init.candidate.clone(),
            },
        };
        serde_json::to_string(&envelope).map_err(|e| SignalingError::Encode(e.to_string()))
    }

    /// Accepts `bye` bare or as a JSON string.
    ///
    /// # Errors
    /// `Decode` for anything else that is not a known JSON message.
    pub fn decode(raw: &str) -> Result<Self, SignalingError> {
        let raw = raw.trim();
        if raw == BYE || raw.trim_matches('"') == BYE {
            return Ok(Self::Bye);
        }
        let envelope: Envelope =
            serde_json::from_str(raw).map_err(|e| SignalingError::Decode(e.to_string()))?;
        Ok(match envelope {
            Envelope::Offer { sdp } => Self::Description(SessionDescription::offer(sdp)),
            Envelope::Answer { sdp } => Self::Description(SessionDescription::answer(sdp)),
            Envelope::Candidate {
                label,
                id,
                candidate,
            } => Self::Candidate(IceCandidate::Candidate(CandidateInit {
                candidate,
                sdp_mid: id,
                sdp_mline_index: label,
            })),
            Envelope::EndOfCandidates => Self::Candidate(IceCandidate::EndOfCandidates),
        })
    }
}
