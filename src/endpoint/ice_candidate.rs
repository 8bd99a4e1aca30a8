use std::fmt;

/// Opaque candidate payload as it travels between endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateInit {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<u16>,
}

/// A discovered path, or the marker that an endpoint finished gathering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IceCandidate {
    Candidate(CandidateInit),
    EndOfCandidates,
}

impl IceCandidate {
    #[must_use]
    pub fn new(
        candidate: impl Into<String>,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    ) -> Self {
        Self::Candidate(CandidateInit {
            candidate: candidate.into(),
            sdp_mid,
            sdp_mline_index,
        })
    }

    #[must_use]
    pub const fn is_end_of_candidates(&self) -> bool {
        matches!(self, Self::EndOfCandidates)
    }
}

impl fmt::Display for IceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Candidate(init) => f.write_str(&init.candidate),
            Self::EndOfCandidates => f.write_str("null"),
        }
    }
}
