use std::net::{IpAddr, SocketAddr, UdpSocket};

use crate::ice::{candidate::Candidate, ice_server::IceConfig};

const RTP_COMPONENT: u8 = 1;

/// Candidates found by one gathering pass, plus the sockets that back the
/// host candidates. Dropping the sockets releases the ports.
#[derive(Debug, Default)]
pub struct Gathered {
    pub candidates: Vec<Candidate>,
    pub sockets: Vec<UdpSocket>,
}

/// Gathers one host candidate per configured interface by binding an
/// ephemeral UDP port on it, then one relayed candidate per TURN server that
/// names a literal socket address.
///
/// # Errors
/// Fails only when no candidate at all could be produced; the message lists
/// the per-interface bind errors.
pub fn gather(config: &IceConfig) -> Result<Gathered, String> {
    let mut out = Gathered::default();
    let mut errors = Vec::new();

    for ip in &config.host_addresses {
        match bind_host(*ip) {
            Ok((addr, sock)) => {
                out.candidates.push(Candidate::host(addr, RTP_COMPONENT));
                out.sockets.push(sock);
            }
            Err(e) => errors.push(format!("{ip}: {e}")),
        }
    }

    let base = out.candidates.first().map(|c| c.address);
    for relay in config.servers.iter().filter_map(|s| s.relay_socket_addr()) {
        let base = base.unwrap_or(relay);
        out.candidates
            .push(Candidate::relayed(relay, base, RTP_COMPONENT));
    }

    if out.candidates.is_empty() {
        return Err(if errors.is_empty() {
            "no host addresses configured".to_string()
        } else {
            errors.join("; ")
        });
    }
    Ok(out)
}

fn bind_host(ip: IpAddr) -> std::io::Result<(SocketAddr, UdpSocket)> {
    let sock = UdpSocket::bind(SocketAddr::new(ip, 0))?;
    let addr = sock.local_addr()?;
    Ok((addr, sock))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::ice::{candidate_type::CandidateType, ice_server::IceServer};

    #[test]
    fn loopback_host_and_literal_relay() {
        let mut cfg = IceConfig::default();
        cfg.servers.push(IceServer::new("turn:u@10.9.8.7:3478"));
        cfg.servers.push(IceServer::new("stun:10.0.0.1:19302"));

        let g = gather(&cfg).expect("loopback bind works");
        assert_eq!(g.sockets.len(), 1);
        assert_eq!(g.candidates.len(), 2);
        assert_eq!(g.candidates[0].cand_type, CandidateType::Host);
        assert!(g.candidates[0].address.ip().is_loopback());
        assert_ne!(g.candidates[0].address.port(), 0);
        assert_eq!(g.candidates[1].cand_type, CandidateType::Relayed);
        assert_eq!(g.candidates[1].related_address, Some(g.candidates[0].address));
    }

    #[test]
    fn nothing_to_gather_is_an_error() {
        let cfg = IceConfig {
            servers: Vec::new(),
            host_addresses: Vec::new(),
        };
        assert!(gather(&cfg).is_err());
    }
}
