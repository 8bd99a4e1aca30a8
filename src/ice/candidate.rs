use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::ice::candidate_type::CandidateType;

const MAX_LOCAL_PREF: u16 = u16::MAX;

/// Offsets used in the priority calculation -> RFC 8445 §5.1.2.1
const TYPE_PREF_SHIFT: u32 = 24;
const LOCAL_PREF_SHIFT: u32 = 8;
const COMPONENT_OFFSET: u32 = 256;

pub const CANDIDATE_PREFIX: &str = "candidate:";

/// A transport address offered for connectivity, in structured form.
///
/// Endpoints only ever see candidates as opaque strings; this type is what
/// the local engine produces and parses behind that boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub foundation: String,
    /// 1 = RTP, 2 = RTCP.
    pub component: u8,
    pub transport: String,
    pub priority: u32,
    pub address: SocketAddr,
    pub cand_type: CandidateType,
    /// Base address for reflexive and relayed candidates.
    pub related_address: Option<SocketAddr>,
}

impl Candidate {
    /// Builds a candidate. An empty `foundation` or a zero `priority` is
    /// computed from the other fields.
    #[must_use]
    pub fn new(
        foundation: String,
        component: u8,
        transport: &str,
        priority: u32,
        address: SocketAddr,
        cand_type: CandidateType,
        related_address: Option<SocketAddr>,
    ) -> Self {
        let transport = transport.to_ascii_lowercase();
        let base_ip = related_address.map_or(address.ip(), |r| r.ip());
        let foundation = if foundation.is_empty() {
            Self::calculate_foundation(cand_type, &transport, base_ip)
        } else {
            foundation
        };
        let priority = if priority == 0 {
            Self::calculate_priority(cand_type, MAX_LOCAL_PREF, component)
        } else {
            priority
        };

        Self {
            foundation,
            component,
            transport,
            priority,
            address,
            cand_type,
            related_address,
        }
    }

    #[must_use]
    pub fn host(address: SocketAddr, component: u8) -> Self {
        Self::new(
            String::new(),
            component,
            "udp",
            0,
            address,
            CandidateType::Host,
            None,
        )
    }

    #[must_use]
    pub fn relayed(address: SocketAddr, base: SocketAddr, component: u8) -> Self {
        Self::new(
            String::new(),
            component,
            "udp",
            0,
            address,
            CandidateType::Relayed,
            Some(base),
        )
    }

    /// Full attribute value, `candidate:` prefix included.
    #[must_use]
    pub fn to_attribute(&self) -> String {
        format!("{CANDIDATE_PREFIX}{self}")
    }

    // RFC 8445 §5.1.1.3: any stable identifier works.
    fn calculate_foundation(cand_type: CandidateType, transport: &str, base_ip: IpAddr) -> String {
        let mut hasher = DefaultHasher::new();
        format!("{cand_type:?}-{transport}-{base_ip}").hash(&mut hasher);
        format!("{:x}", hasher.finish() & 0xffff_ffff)
    }

    // RFC 8445 §5.1.2.1
    const fn calculate_priority(cand_type: CandidateType, local_pref: u16, component: u8) -> u32 {
        (cand_type.type_preference() << TYPE_PREF_SHIFT)
            | ((local_pref as u32) << LOCAL_PREF_SHIFT)
            | (COMPONENT_OFFSET - component as u32)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} typ {}",
            self.foundation,
            self.component,
            self.transport,
            self.priority,
            self.address.ip(),
            self.address.port(),
            self.cand_type.as_sdp_str(),
        )?;
        if let Some(rel) = self.related_address {
            write!(f, " raddr {} rport {}", rel.ip(), rel.port())?;
        }
        Ok(())
    }
}

impl FromStr for Candidate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("a=").unwrap_or(s);
        let s = s.strip_prefix(CANDIDATE_PREFIX).unwrap_or(s);

        let mut parts = s.split_whitespace();
        let mut next = |what: &'static str| {
            parts
                .next()
                .ok_or_else(|| format!("Invalid candidate string, missing {what}: '{s}'"))
        };

        let foundation = next("foundation")?.to_string();
        let component: u8 = next("component")?
            .parse()
            .map_err(|_| "Invalid component".to_string())?;
        let transport = next("transport")?.to_string();
        let priority: u32 = next("priority")?
            .parse()
            .map_err(|_| "Invalid priority".to_string())?;
        let ip: IpAddr = next("address")?
            .parse()
            .map_err(|_| "Invalid IP address".to_string())?;
        let port: u16 = next("port")?
            .parse()
            .map_err(|_| "Invalid port".to_string())?;
        if next("typ")? != "typ" {
            return Err("Missing 'typ' token in candidate".into());
        }
        let cand_type: CandidateType = next("candidate type")?.parse()?;

        // Extension pairs: only raddr/rport matter here.
        let rest: Vec<&str> = parts.collect();
        let mut related_ip: Option<IpAddr> = None;
        let mut related_port: Option<u16> = None;
        for pair in rest.chunks(2) {
            match pair {
                ["raddr", v] => {
                    related_ip = Some(v.parse().map_err(|_| "Invalid raddr IP".to_string())?);
                }
                ["rport", v] => {
                    related_port = Some(v.parse().map_err(|_| "Invalid rport value".to_string())?);
                }
                _ => {}
            }
        }
        let related_address = related_ip.map(|ip| SocketAddr::new(ip, related_port.unwrap_or(0)));

        Ok(Self {
            foundation,
            component,
            transport: transport.to_ascii_lowercase(),
            priority,
            address: SocketAddr::new(ip, port),
            cand_type,
            related_address,
        })
    }
}
