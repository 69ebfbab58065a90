//! Error types for the RTSP media transport library.

use std::fmt;

use crate::transport::Protocol;

/// Errors that can occur in the RTSP media transport library.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Configuration**: [`Parse`](Self::Parse) with
///   [`ParseErrorKind::InvalidPortRange`], [`PortRangeTooNarrow`](Self::PortRangeTooNarrow).
///   Both are startup conditions and are never retried.
/// - **RTP**: [`Rtp`](Self::Rtp), raised only when building an owned
///   [`RtpPacket`](crate::media::rtp::RtpPacket). Classification helpers
///   report bad input through `bool`/`Option` instead.
/// - **Transport**: [`PortPoolExhausted`](Self::PortPoolExhausted),
///   [`Bind`](Self::Bind), [`Io`](Self::Io). The socket pair allocator
///   retries these before surfacing them.
///
/// Malformed SDP is not represented here: bad lines are dropped while
/// parsing continues.
#[derive(Debug, thiserror::Error)]
pub enum RtspError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a textual value.
    #[error("parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// A buffer could not be wrapped as an RTP packet.
    #[error("RTP error: {kind}")]
    Rtp { kind: RtpErrorKind },

    /// Configured port range spans fewer than 36 ports.
    #[error("port range {min}-{max} is too narrow (at least 36 ports required)")]
    PortRangeTooNarrow { min: u16, max: u16 },

    /// Every port pair of the pool is currently held.
    #[error("no reserved {protocol} port pair left in pool")]
    PortPoolExhausted { protocol: Protocol },

    /// The OS refused to bind (UDP) or listen (TCP) on a pool port.
    #[error("open {protocol} socket on port {port} failed: {source}")]
    Bind {
        protocol: Protocol,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// Specific kind of text parse failure.
#[derive(Debug)]
pub enum ParseErrorKind {
    /// Port range was not of the form `<min>-<max>` with `min <= max`.
    InvalidPortRange(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPortRange(value) => write!(f, "invalid port range {value:?}"),
        }
    }
}

/// Specific kind of RTP packet construction failure.
#[derive(Debug, PartialEq, Eq)]
pub enum RtpErrorKind {
    /// Fewer bytes than the 12-byte fixed header.
    TooShort { len: usize },
    /// Interleaved frame did not start with `'$'`.
    MissingInterleavedMagic,
    /// Interleaved prefix length disagrees with the bytes that follow it.
    InterleavedLengthMismatch { declared: usize, actual: usize },
    /// Packet is too large to be framed with a 16-bit length.
    TooLargeForInterleave { len: usize },
}

impl fmt::Display for RtpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => write!(f, "{len} bytes is shorter than the RTP header"),
            Self::MissingInterleavedMagic => write!(f, "interleaved frame must start with '$'"),
            Self::InterleavedLengthMismatch { declared, actual } => write!(
                f,
                "interleaved prefix declares {declared} bytes, frame carries {actual}"
            ),
            Self::TooLargeForInterleave { len } => {
                write!(f, "{len} bytes does not fit a 16-bit interleaved length")
            }
        }
    }
}

/// Convenience alias for `Result<T, RtspError>`.
pub type Result<T> = std::result::Result<T, RtspError>;
