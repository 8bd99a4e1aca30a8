use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::config::Config;

const ICE_SECTION: &str = "Ice";

/// One STUN/TURN server entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceServer {
    pub urls: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServer {
    #[must_use]
    pub fn new(urls: impl Into<String>) -> Self {
        Self {
            urls: urls.into(),
            username: None,
            credential: None,
        }
    }

    #[must_use]
    pub fn is_turn(&self) -> bool {
        self.urls.starts_with("turn:") || self.urls.starts_with("turns:")
    }

    /// Relay address when the url names a literal `ip:port`
    /// (`turn:[user@]10.0.0.1:3478[?transport=udp]`).
    #[must_use]
    pub fn relay_socket_addr(&self) -> Option<SocketAddr> {
        if !self.is_turn() {
            return None;
        }
        let rest = self.urls.split_once(':').map(|(_, r)| r)?;
        let rest = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
        let rest = rest.split_once('?').map_or(rest, |(host, _)| host);
        rest.parse().ok()
    }
}

/// ICE configuration handed to each endpoint's engine at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceConfig {
    pub servers: Vec<IceServer>,
    /// Interfaces host candidates are gathered on.
    pub host_addresses: Vec<IpAddr>,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            host_addresses: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
        }
    }
}

impl IceConfig {
    /// Reads `[Ice] servers` and `[Ice] host_addresses`. Unparseable
    /// addresses are skipped; an empty list falls back to loopback.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let servers = config
            .get_list(ICE_SECTION, "servers")
            .into_iter()
            .map(IceServer::new)
            .collect();
        let mut host_addresses: Vec<IpAddr> = config
            .get_list(ICE_SECTION, "host_addresses")
            .iter()
            .filter_map(|a| a.parse().ok())
            .collect();
        if host_addresses.is_empty() {
            host_addresses = Self::default().host_addresses;
        }
        Self {
            servers,
            host_addresses,
        }
    }

    #[must_use]
    pub fn has_turn(&self) -> bool {
        self.servers.iter().any(IceServer::is_turn)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn relay_address_from_literal_turn_url() {
        let s = IceServer::new("turn:alice@10.1.2.3:3478?transport=udp");
        assert!(s.is_turn());
        assert_eq!(s.relay_socket_addr(), Some("10.1.2.3:3478".parse().unwrap()));

        assert_eq!(IceServer::new("turn:turn.example.org:3478").relay_socket_addr(), None);
        assert_eq!(IceServer::new("stun:10.1.2.3:3478").relay_socket_addr(), None);
    }

    #[test]
    fn from_config_reads_servers_and_falls_back_to_loopback() {
        let cfg = Config::parse(
            "[Ice]\nservers = stun:stun.l.google.com:19302, turn:10.0.0.1:3478\nhost_addresses = bogus\n",
        );
        let ice = IceConfig::from_config(&cfg);
        assert_eq!(ice.servers.len(), 2);
        assert!(ice.has_turn());
        assert_eq!(ice.host_addresses, vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);
    }
}
