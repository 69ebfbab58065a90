use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rand::RngExt;

use super::Protocol;
use crate::config::{ConfigSource, PortRange};
use crate::error::Result;

/// Pool of reusable RTP/RTCP port pair indices.
///
/// Index `i` stands for RTP port `2i` and RTCP port `2i + 1`. Indices are
/// shuffled once at construction so consecutive sessions do not land on
/// predictable ports. A served index goes back to the end of the queue
/// when its [`PortPair`] is dropped, which keeps a just-released pair from
/// being handed out again right away.
///
/// Cloning yields another handle to the same pool.
#[derive(Debug, Clone)]
pub struct PortPairPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    protocol: Protocol,
    capacity: usize,
    free: Mutex<VecDeque<u16>>,
}

impl PortPairPool {
    /// Build a pool covering `range`, which must span at least 36 ports.
    pub fn new(protocol: Protocol, range: PortRange) -> Result<Self> {
        range.validate()?;

        let indices = range.pair_indices();
        let mut free = VecDeque::with_capacity(indices.len());
        let mut rng = rand::rng();
        let mut cursor = 0;
        for index in indices {
            free.insert(cursor, index);
            cursor = rng.random::<u32>() as usize % (free.len() + 1);
        }

        tracing::debug!(
            %protocol,
            min = range.min,
            max = range.max,
            pairs = free.len(),
            "port pair pool ready"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                protocol,
                capacity: free.len(),
                free: Mutex::new(free),
            }),
        })
    }

    /// Build a pool from the `rtp_proxy.port_range` setting.
    pub fn from_config(protocol: Protocol, source: &dyn ConfigSource) -> Result<Self> {
        Self::new(protocol, PortRange::from_source(source)?)
    }

    /// Take the next free pair, or `None` if every pair is held.
    ///
    /// The pair is returned to the pool when the last clone of the
    /// returned handle is dropped.
    pub fn acquire(&self) -> Option<Arc<PortPair>> {
        let index = self.inner.free.lock().pop_front()?;
        tracing::debug!(
            protocol = %self.inner.protocol,
            rtp_port = index * 2,
            "acquired port pair"
        );
        Some(Arc::new(PortPair {
            index,
            protocol: self.inner.protocol,
            pool: Arc::downgrade(&self.inner),
        }))
    }

    /// Number of pairs currently free.
    pub fn available(&self) -> usize {
        self.inner.free.lock().len()
    }

    /// Total number of pairs in the pool.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Protocol this pool reserves ports for.
    pub fn protocol(&self) -> Protocol {
        self.inner.protocol
    }
}

/// A reserved port pair, released back to its pool on drop.
///
/// Share it as `Arc<PortPair>` between the sockets bound on its ports.
/// If the pool itself is gone by the time the pair is dropped, the index
/// is simply discarded.
#[derive(Debug)]
pub struct PortPair {
    index: u16,
    protocol: Protocol,
    pool: Weak<PoolInner>,
}

impl PortPair {
    /// Pair index `i`.
    pub fn index(&self) -> u16 {
        self.index
    }

    /// RTP port, `2i`.
    pub fn rtp_port(&self) -> u16 {
        self.index * 2
    }

    /// RTCP port, `2i + 1`.
    pub fn rtcp_port(&self) -> u16 {
        self.index * 2 + 1
    }

    /// Protocol of the pool this pair came from.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

impl Drop for PortPair {
    fn drop(&mut self) {
        let Some(pool) = self.pool.upgrade() else {
            return;
        };
        tracing::debug!(
            protocol = %self.protocol,
            rtp_port = self.rtp_port(),
            "released port pair"
        );
        pool.free.lock().push_back(self.index);
    }
}

/// The UDP and TCP pools of a process.
#[derive(Debug, Clone)]
pub struct PortPools {
    pub udp: PortPairPool,
    pub tcp: PortPairPool,
}

impl PortPools {
    /// Both pools over the same port range.
    pub fn new(range: PortRange) -> Result<Self> {
        Ok(Self {
            udp: PortPairPool::new(Protocol::Udp, range)?,
            tcp: PortPairPool::new(Protocol::Tcp, range)?,
        })
    }

    /// Both pools from the `rtp_proxy.port_range` setting.
    pub fn from_config(source: &dyn ConfigSource) -> Result<Self> {
        Self::new(PortRange::from_source(source)?)
    }

    /// Pool serving `protocol`.
    pub fn pool(&self, protocol: Protocol) -> &PortPairPool {
        match protocol {
            Protocol::Udp => &self.udp,
            Protocol::Tcp => &self.tcp,
        }
    }
}
