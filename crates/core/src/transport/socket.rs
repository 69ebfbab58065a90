use std::io;
use std::net::{IpAddr, SocketAddr, TcpListener, UdpSocket};
use std::sync::Arc;

use socket2::{Domain, Socket, Type};

use super::{PortPair, PortPools, Protocol};
use crate::config::ConfigSource;
use crate::error::{Result, RtspError};

/// Attempts [`SocketPairAllocator::make_sock_pair`] makes before giving up.
pub const MAKE_SOCK_PAIR_ATTEMPTS: usize = 3;

/// Opens sockets on explicit ports.
///
/// The allocator only decides which ports to use; implementations decide
/// what a bound socket is (blocking std sockets, an async runtime's types,
/// or a test double).
pub trait SocketFactory {
    type Socket;

    /// Bind a UDP socket on `ip:port`, optionally with address/port reuse.
    fn bind_udp(&self, port: u16, ip: IpAddr, reuse_port: bool) -> io::Result<Self::Socket>;

    /// Open a TCP listener on `ip:port`.
    fn listen_tcp(&self, port: u16, ip: IpAddr) -> io::Result<Self::Socket>;
}

/// A socket opened by [`StdSocketFactory`].
#[derive(Debug)]
pub enum BoundSocket {
    Udp(UdpSocket),
    Tcp(TcpListener),
}

impl BoundSocket {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Self::Udp(socket) => socket.local_addr(),
            Self::Tcp(listener) => listener.local_addr(),
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Udp(_) => Protocol::Udp,
            Self::Tcp(_) => Protocol::Tcp,
        }
    }

    pub fn as_udp(&self) -> Option<&UdpSocket> {
        match self {
            Self::Udp(socket) => Some(socket),
            Self::Tcp(_) => None,
        }
    }

    pub fn as_tcp(&self) -> Option<&TcpListener> {
        match self {
            Self::Tcp(listener) => Some(listener),
            Self::Udp(_) => None,
        }
    }
}

/// Blocking `std::net` sockets. UDP reuse is configured through `socket2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdSocketFactory;

impl SocketFactory for StdSocketFactory {
    type Socket = BoundSocket;

    fn bind_udp(&self, port: u16, ip: IpAddr, reuse_port: bool) -> io::Result<BoundSocket> {
        let addr = SocketAddr::new(ip, port);
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, None)?;
        if reuse_port {
            socket.set_reuse_address(true)?;
            #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
            socket.set_reuse_port(true)?;
        }
        socket.bind(&addr.into())?;
        Ok(BoundSocket::Udp(socket.into()))
    }

    fn listen_tcp(&self, port: u16, ip: IpAddr) -> io::Result<BoundSocket> {
        Ok(BoundSocket::Tcp(TcpListener::bind(SocketAddr::new(ip, port))?))
    }
}

/// RTP and RTCP sockets bound on one reserved port pair.
///
/// The pair also holds the opposite-protocol sockets bound on the same two
/// ports, and keeps them open for as long as it lives. The port pair
/// returns to its pool once this value and every clone of
/// [`port_pair`](Self::port_pair) are dropped.
#[derive(Debug)]
pub struct SocketPair<S> {
    pub rtp: S,
    pub rtcp: S,
    reserved: (S, S),
    port_pair: Arc<PortPair>,
}

impl<S> SocketPair<S> {
    pub fn protocol(&self) -> Protocol {
        self.port_pair.protocol()
    }

    pub fn rtp_port(&self) -> u16 {
        self.port_pair.rtp_port()
    }

    pub fn rtcp_port(&self) -> u16 {
        self.port_pair.rtcp_port()
    }

    /// Shared reservation handle.
    pub fn port_pair(&self) -> &Arc<PortPair> {
        &self.port_pair
    }

    /// Opposite-protocol sockets holding the same ports, RTP first.
    pub fn reserved(&self) -> (&S, &S) {
        (&self.reserved.0, &self.reserved.1)
    }
}

/// Opens RTP/RTCP socket pairs on ports drawn from [`PortPools`].
#[derive(Debug)]
pub struct SocketPairAllocator<F> {
    pools: PortPools,
    factory: F,
}

impl<F: SocketFactory> SocketPairAllocator<F> {
    pub fn new(pools: PortPools, factory: F) -> Self {
        Self { pools, factory }
    }

    /// Pools built from the `rtp_proxy.port_range` setting.
    pub fn from_config(source: &dyn ConfigSource, factory: F) -> Result<Self> {
        Ok(Self::new(PortPools::from_config(source)?, factory))
    }

    pub fn pools(&self) -> &PortPools {
        &self.pools
    }

    /// Bind an RTP/RTCP pair for `protocol` on `local_ip`.
    ///
    /// Each attempt takes a fresh pair from the pool, binds `protocol` on
    /// both ports, then binds the opposite protocol on the same ports. A
    /// failure at any step releases the pair and triggers another attempt,
    /// up to [`MAKE_SOCK_PAIR_ATTEMPTS`]; the last failure is returned.
    /// `reuse_port` applies to UDP binds only.
    pub fn make_sock_pair(
        &self,
        local_ip: IpAddr,
        reuse_port: bool,
        protocol: Protocol,
    ) -> Result<SocketPair<F::Socket>> {
        let mut attempt = 1;
        loop {
            match self.try_make_sock_pair(local_ip, reuse_port, protocol) {
                Ok(pair) => {
                    tracing::debug!(
                        %protocol,
                        %local_ip,
                        rtp_port = pair.rtp_port(),
                        rtcp_port = pair.rtcp_port(),
                        "opened socket pair"
                    );
                    return Ok(pair);
                }
                Err(e) if attempt < MAKE_SOCK_PAIR_ATTEMPTS => {
                    tracing::warn!(%protocol, %local_ip, attempt, error = %e, "open socket pair failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_make_sock_pair(
        &self,
        local_ip: IpAddr,
        reuse_port: bool,
        protocol: Protocol,
    ) -> Result<SocketPair<F::Socket>> {
        let port_pair = self
            .pools
            .pool(protocol)
            .acquire()
            .ok_or(RtspError::PortPoolExhausted { protocol })?;

        let (rtp, rtcp) = self.bind_pair(&port_pair, local_ip, reuse_port, protocol)?;
        let reserved = self.bind_pair(&port_pair, local_ip, reuse_port, protocol.opposite())?;

        Ok(SocketPair {
            rtp,
            rtcp,
            reserved,
            port_pair,
        })
    }

    fn bind_pair(
        &self,
        port_pair: &PortPair,
        local_ip: IpAddr,
        reuse_port: bool,
        protocol: Protocol,
    ) -> Result<(F::Socket, F::Socket)> {
        let bind = |port: u16| {
            match protocol {
                Protocol::Udp => self.factory.bind_udp(port, local_ip, reuse_port),
                Protocol::Tcp => self.factory.listen_tcp(port, local_ip),
            }
            .map_err(|source| RtspError::Bind {
                protocol,
                port,
                source,
            })
        };
        let rtp = bind(port_pair.rtp_port())?;
        let rtcp = bind(port_pair.rtcp_port())?;
        Ok((rtp, rtcp))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::net::Ipv4Addr;

    use parking_lot::Mutex;

    use super::*;
    use crate::config::PortRange;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[derive(Debug, PartialEq, Eq)]
    struct FakeSocket {
        protocol: Protocol,
        port: u16,
        reuse_port: bool,
    }

    /// Records binds; fails ports listed in `busy` and the first `fail_first` calls.
    #[derive(Default)]
    struct FakeFactory {
        busy: HashSet<(Protocol, u16)>,
        fail_first: Mutex<usize>,
        calls: Mutex<Vec<(Protocol, u16)>>,
    }

    impl FakeFactory {
        fn open(&self, protocol: Protocol, port: u16, reuse_port: bool) -> io::Result<FakeSocket> {
            self.calls.lock().push((protocol, port));
            let mut fail_first = self.fail_first.lock();
            if *fail_first > 0 {
                *fail_first -= 1;
                return Err(io::ErrorKind::AddrInUse.into());
            }
            if self.busy.contains(&(protocol, port)) {
                return Err(io::ErrorKind::AddrInUse.into());
            }
            Ok(FakeSocket {
                protocol,
                port,
                reuse_port,
            })
        }
    }

    impl SocketFactory for FakeFactory {
        type Socket = FakeSocket;

        fn bind_udp(&self, port: u16, _ip: IpAddr, reuse_port: bool) -> io::Result<FakeSocket> {
            self.open(Protocol::Udp, port, reuse_port)
        }

        fn listen_tcp(&self, port: u16, _ip: IpAddr) -> io::Result<FakeSocket> {
            self.open(Protocol::Tcp, port, false)
        }
    }

    fn allocator(factory: FakeFactory) -> SocketPairAllocator<FakeFactory> {
        let pools = PortPools::new(PortRange {
            min: 40000,
            max: 40036,
        })
        .unwrap();
        SocketPairAllocator::new(pools, factory)
    }

    #[test]
    fn udp_pair_reserves_tcp_ports() {
        let allocator = allocator(FakeFactory::default());
        let pair = allocator
            .make_sock_pair(LOCALHOST, true, Protocol::Udp)
            .unwrap();

        let rtp_port = pair.rtp_port();
        assert_eq!(rtp_port % 2, 0);
        assert_eq!(pair.rtcp_port(), rtp_port + 1);
        assert_eq!(pair.protocol(), Protocol::Udp);
        assert_eq!(
            pair.rtp,
            FakeSocket {
                protocol: Protocol::Udp,
                port: rtp_port,
                reuse_port: true
            }
        );
        assert_eq!(pair.rtcp.port, rtp_port + 1);

        let (reserved_rtp, reserved_rtcp) = pair.reserved();
        assert_eq!(reserved_rtp.protocol, Protocol::Tcp);
        assert_eq!(reserved_rtp.port, rtp_port);
        assert_eq!(reserved_rtcp.port, rtp_port + 1);

        assert_eq!(
            *allocator.factory.calls.lock(),
            vec![
                (Protocol::Udp, rtp_port),
                (Protocol::Udp, rtp_port + 1),
                (Protocol::Tcp, rtp_port),
                (Protocol::Tcp, rtp_port + 1),
            ]
        );
    }

    #[test]
    fn tcp_pair_draws_from_tcp_pool() {
        let allocator = allocator(FakeFactory::default());
        let pair = allocator
            .make_sock_pair(LOCALHOST, true, Protocol::Tcp)
            .unwrap();
        assert_eq!(pair.rtp.protocol, Protocol::Tcp);
        assert!(!pair.rtp.reuse_port);
        assert_eq!(pair.reserved().0.protocol, Protocol::Udp);
        assert_eq!(allocator.pools().tcp.available(), 17);
        assert_eq!(allocator.pools().udp.available(), 18);
    }

    #[test]
    fn retries_after_bind_failure() {
        let factory = FakeFactory {
            fail_first: Mutex::new(1),
            ..FakeFactory::default()
        };
        let allocator = allocator(factory);
        let pair = allocator
            .make_sock_pair(LOCALHOST, false, Protocol::Udp)
            .unwrap();

        let calls = allocator.factory.calls.lock();
        assert_eq!(calls.len(), 5);
        assert_ne!(calls[0].1, pair.rtp_port());
        // The failed pair went back to the pool.
        assert_eq!(allocator.pools().udp.available(), 17);
    }

    #[test]
    fn auxiliary_bind_failure_fails_the_attempt() {
        let busy = (40000..40036).map(|port| (Protocol::Tcp, port)).collect();
        let allocator = allocator(FakeFactory {
            busy,
            ..FakeFactory::default()
        });
        let err = allocator
            .make_sock_pair(LOCALHOST, false, Protocol::Udp)
            .unwrap_err();
        assert!(matches!(
            err,
            RtspError::Bind {
                protocol: Protocol::Tcp,
                ..
            }
        ));
        // Three attempts, each binding two UDP ports then failing one TCP bind.
        assert_eq!(allocator.factory.calls.lock().len(), 9);
        assert_eq!(allocator.pools().udp.available(), 18);
    }

    #[test]
    fn exhausted_pool() {
        let allocator = allocator(FakeFactory::default());
        let held: Vec<_> = (0..18)
            .map(|_| {
                allocator
                    .make_sock_pair(LOCALHOST, false, Protocol::Udp)
                    .unwrap()
            })
            .collect();
        let ports: HashSet<u16> = held.iter().map(|p| p.rtp_port()).collect();
        assert_eq!(ports.len(), 18);

        let err = allocator
            .make_sock_pair(LOCALHOST, false, Protocol::Udp)
            .unwrap_err();
        assert!(matches!(
            err,
            RtspError::PortPoolExhausted {
                protocol: Protocol::Udp
            }
        ));

        drop(held);
        assert_eq!(allocator.pools().udp.available(), 18);
    }

    #[test]
    fn pair_released_when_lease_clone_drops() {
        let allocator = allocator(FakeFactory::default());
        let pair = allocator
            .make_sock_pair(LOCALHOST, false, Protocol::Udp)
            .unwrap();
        let lease = Arc::clone(pair.port_pair());
        drop(pair);
        assert_eq!(allocator.pools().udp.available(), 17);
        drop(lease);
        assert_eq!(allocator.pools().udp.available(), 18);
    }
}
