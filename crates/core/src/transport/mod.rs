//! Port reservation and socket binding for RTP media delivery.
//!
//! RTP and RTCP travel on an adjacent port pair (RFC 3550 §11): RTP on an
//! even port `2i`, RTCP on `2i + 1`.
//!
//! - [`port_pool`]: a process-wide pool of pair indices per transport
//!   protocol, handed out in randomized order and returned automatically
//!   when the last holder of a [`PortPair`] lets go.
//!
//! - [`socket`]: binds a pool pair for the requested protocol and parks the
//!   opposite protocol on the same ports so no other media session can
//!   claim them while the pair is in use.

use std::fmt;

pub mod port_pool;
pub mod socket;

pub use port_pool::{PortPair, PortPairPool, PortPools};
pub use socket::{BoundSocket, SocketFactory, SocketPair, SocketPairAllocator, StdSocketFactory};

/// Transport protocol a port pair is reserved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl Protocol {
    /// The other protocol, bound alongside to reserve the same ports.
    pub fn opposite(self) -> Self {
        match self {
            Self::Udp => Self::Tcp,
            Self::Tcp => Self::Udp,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("UDP"),
            Self::Tcp => f.write_str("TCP"),
        }
    }
}
