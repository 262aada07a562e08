//! Host and port auto-detection for self-registration.

use crate::agent::AgentServices;
use crate::error::DiscoveryError;
use crate::service::{authority, base_uri};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::io;
use std::net::IpAddr;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Port used when no instance is bound on the resolved host yet.
pub const DEFAULT_PORT: u16 = 5000;

/// Host advertised when the machine has no usable network.
pub const LOOPBACK_HOST: &str = "localhost";

/// Public address the routing probe "connects" to. No datagram is sent.
const ROUTING_PROBE_TARGET: &str = "8.8.8.8:65530";

/// Host and port this instance advertises, fixed at first registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedEndpoint {
    pub host: String,
    pub port: u16,
}

impl ResolvedEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `http://<host>:<port>/`
    pub fn base_uri(&self) -> String {
        base_uri(&self.host, self.port)
    }
}

impl fmt::Display for ResolvedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&authority(&self.host, self.port))
    }
}

/// Access to the host's network state.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Whether any non-loopback interface is present.
    fn is_network_available(&self) -> bool;

    /// Local address the OS would use for outbound traffic.
    async fn outbound_address(&self) -> io::Result<IpAddr>;
}

/// [`NetworkProbe`] backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNetwork;

#[async_trait]
impl NetworkProbe for SystemNetwork {
    fn is_network_available(&self) -> bool {
        match if_addrs::get_if_addrs() {
            Ok(interfaces) => interfaces.iter().any(|iface| !iface.is_loopback()),
            Err(e) => {
                debug!(error = %e, "failed to enumerate network interfaces");
                false
            }
        }
    }

    async fn outbound_address(&self) -> io::Result<IpAddr> {
        // Connecting a UDP socket only selects a route; nothing goes on the wire.
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        socket.connect(ROUTING_PROBE_TARGET).await?;
        Ok(socket.local_addr()?.ip())
    }
}

/// Determine the address other hosts can reach this instance on.
///
/// Without a usable network this is [`LOOPBACK_HOST`] and no socket is opened.
/// Otherwise the OS routing table picks the outbound interface, which handles
/// multi-homed hosts without parsing interface tables.
pub async fn resolve_host(network: &dyn NetworkProbe) -> String {
    if !network.is_network_available() {
        debug!("no network interface available, advertising loopback");
        return LOOPBACK_HOST.to_string();
    }

    match network.outbound_address().await {
        Ok(ip) => ip.to_string(),
        Err(e) => {
            warn!(error = %e, "failed to determine outbound address, advertising loopback");
            LOOPBACK_HOST.to_string()
        }
    }
}

/// Pick the next free port on `host` from a catalog snapshot.
///
/// Instances already advertised on the same host (case-insensitive) push the
/// port to one above the highest of them; an empty host gets [`DEFAULT_PORT`].
pub fn resolve_port(host: &str, services: &AgentServices) -> Result<u16, DiscoveryError> {
    let highest = services
        .values()
        .filter(|service| service.address.eq_ignore_ascii_case(host))
        .map(|service| service.port)
        .max();

    match highest {
        None => Ok(DEFAULT_PORT),
        Some(port) => port
            .checked_add(1)
            .ok_or_else(|| DiscoveryError::PortExhausted {
                host: host.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentService;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeNetwork {
        available: bool,
        address: Option<IpAddr>,
        probes: AtomicUsize,
    }

    impl FakeNetwork {
        fn new(available: bool, address: Option<IpAddr>) -> Self {
            Self {
                available,
                address,
                probes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NetworkProbe for FakeNetwork {
        fn is_network_available(&self) -> bool {
            self.available
        }

        async fn outbound_address(&self) -> io::Result<IpAddr> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.address
                .ok_or_else(|| io::Error::new(io::ErrorKind::NetworkUnreachable, "unreachable"))
        }
    }

    fn catalog(entries: &[(&str, &str, u16)]) -> AgentServices {
        entries
            .iter()
            .map(|(id, address, port)| {
                (
                    id.to_string(),
                    AgentService::new(*id, "svc", *address, *port),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_no_network_is_loopback_without_probe() {
        let network = FakeNetwork::new(false, Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))));

        assert_eq!(resolve_host(&network).await, "localhost");
        assert_eq!(resolve_host(&network).await, "localhost");
        assert_eq!(network.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_outbound_address_is_used() {
        let network = FakeNetwork::new(true, Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))));

        assert_eq!(resolve_host(&network).await, "10.0.0.5");
        assert_eq!(network.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_probe_failure_falls_back_to_loopback() {
        let network = FakeNetwork::new(true, None);
        assert_eq!(resolve_host(&network).await, "localhost");
    }

    #[test]
    fn test_port_above_instances_on_same_host() {
        let services = catalog(&[("a", "10.0.0.5", 5001), ("b", "10.0.0.5", 5003)]);
        assert_eq!(resolve_port("10.0.0.5", &services).unwrap(), 5004);
    }

    #[test]
    fn test_other_hosts_are_ignored() {
        let services = catalog(&[("a", "10.0.0.5", 5001), ("b", "10.0.0.6", 9000)]);
        assert_eq!(resolve_port("10.0.0.5", &services).unwrap(), 5002);
        assert_eq!(resolve_port("10.0.0.7", &services).unwrap(), DEFAULT_PORT);
    }

    #[test]
    fn test_host_match_is_case_insensitive() {
        let services = catalog(&[("a", "Build-Box.local", 6000)]);
        assert_eq!(resolve_port("build-box.LOCAL", &services).unwrap(), 6001);
    }

    #[test]
    fn test_empty_catalog_uses_default() {
        assert_eq!(resolve_port("10.0.0.5", &AgentServices::new()).unwrap(), 5000);
    }

    #[test]
    fn test_port_exhausted() {
        let services = catalog(&[("a", "10.0.0.5", u16::MAX)]);
        assert!(matches!(
            resolve_port("10.0.0.5", &services),
            Err(DiscoveryError::PortExhausted { host }) if host == "10.0.0.5"
        ));
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(ResolvedEndpoint::new("10.0.0.5", 5000).to_string(), "10.0.0.5:5000");
        assert_eq!(ResolvedEndpoint::new("::1", 5000).to_string(), "[::1]:5000");
        assert_eq!(ResolvedEndpoint::new("localhost", 5000).base_uri(), "http://localhost:5000/");
    }
}
