//! One-shot network reachability check.
//!
//! # Design
//! A probe samples route flags once; there is no polling and no change
//! notification. `SystemProbe` asks the OS for a route to a public address by
//! connecting an unbound UDP socket, which resolves the route without sending
//! a packet. The routing table does not report whether a route needs an extra
//! activation step, so `connection_required` is always false for it.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

/// Flags for the default route at the moment of sampling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReachabilityFlags {
    pub reachable: bool,
    /// The route exists but needs a connection to be established first
    /// (cellular activation, on-demand VPN).
    pub connection_required: bool,
}

impl ReachabilityFlags {
    pub fn is_connected(&self) -> bool {
        self.reachable && !self.connection_required
    }
}

pub trait ReachabilityProbe {
    /// `None` when the flags could not be read.
    fn flags(&self) -> Option<ReachabilityFlags>;

    fn is_connected_to_network(&self) -> bool {
        self.flags().is_some_and(|flags| flags.is_connected())
    }
}

/// Probe backed by the OS routing table.
#[derive(Debug, Clone, Copy)]
pub struct SystemProbe {
    target: SocketAddr,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            target: SocketAddr::from((Ipv4Addr::new(8, 8, 8, 8), 53)),
        }
    }

    /// Probe the route to `target` instead of the default public address.
    pub fn with_target(target: SocketAddr) -> Self {
        Self { target }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachabilityProbe for SystemProbe {
    fn flags(&self) -> Option<ReachabilityFlags> {
        let bind_addr = match self.target {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((std::net::Ipv6Addr::UNSPECIFIED, 0)),
        };
        let socket = UdpSocket::bind(bind_addr).ok()?;

        match socket.connect(self.target) {
            Ok(()) => {
                let local = socket.local_addr().ok()?;
                Some(ReachabilityFlags {
                    reachable: !local.ip().is_unspecified(),
                    connection_required: false,
                })
            }
            Err(e) if is_unreachable(e.kind()) => Some(ReachabilityFlags::default()),
            Err(e) => {
                tracing::debug!(error = %e, "could not read route flags");
                None
            }
        }
    }
}

fn is_unreachable(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::NetworkUnreachable | ErrorKind::HostUnreachable | ErrorKind::AddrNotAvailable
    )
}

/// Probe that always reports the same flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProbe(pub Option<ReachabilityFlags>);

impl ReachabilityProbe for StaticProbe {
    fn flags(&self) -> Option<ReachabilityFlags> {
        self.0
    }
}

/// Whether the default route is usable right now.
pub fn is_connected_to_network() -> bool {
    SystemProbe::new().is_connected_to_network()
}
