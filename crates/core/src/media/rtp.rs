use std::fmt;

use rand::RngExt;

use super::TrackType;
use crate::error::{Result, RtpErrorKind, RtspError};

/// RTP protocol version carried in the top two bits of byte 0.
pub const RTP_VERSION: u8 = 2;

/// Size of the fixed RTP header.
pub const RTP_HEADER_SIZE: usize = 12;

/// Size of the RTSP interleaved frame prefix (RFC 2326 §10.12).
pub const RTP_TCP_HEADER_SIZE: usize = 4;

/// Bounds-checked view over an RTP packet (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// |                  CSRC list (CC × 32 bits)                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      reserved (if X)          |     length in 32-bit words    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                 header extension (length × 32 bits)           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |          payload ...          | padding ... | padding count   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The fixed 12 bytes are checked once by [`new`](Self::new). Offsets of the
/// variable regions are computed from the header fields and are relative to
/// the first byte after the fixed header. A header that claims more CSRC,
/// extension or padding bytes than the buffer holds yields a negative
/// [`payload_size`](Self::payload_size); slice accessors return `None` for it.
#[derive(Clone, Copy)]
pub struct RtpHeader<'a> {
    data: &'a [u8],
}

impl<'a> RtpHeader<'a> {
    /// Wrap `data`, which must start at the RTP header (no interleaved prefix).
    pub fn new(data: &'a [u8]) -> Option<Self> {
        if data.len() < RTP_HEADER_SIZE {
            return None;
        }
        Some(Self { data })
    }

    /// Total packet length, header included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: a header holds at least 12 bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// RTP version (V), 2 for conforming senders.
    pub fn version(&self) -> u8 {
        self.data[0] >> 6
    }

    /// Padding bit (P): trailing padding, counted by the last byte.
    pub fn has_padding(&self) -> bool {
        self.data[0] & 0x20 != 0
    }

    /// Extension bit (X): a header extension follows the CSRC list.
    pub fn has_extension(&self) -> bool {
        self.data[0] & 0x10 != 0
    }

    /// Number of CSRC identifiers (CC).
    pub fn csrc_count(&self) -> u8 {
        self.data[0] & 0x0f
    }

    /// Marker bit (M), e.g. the last packet of a video frame.
    pub fn marker(&self) -> bool {
        self.data[1] & 0x80 != 0
    }

    /// Payload type (PT), 7 bits.
    pub fn payload_type(&self) -> u8 {
        self.data[1] & 0x7f
    }

    /// Sequence number, incremented per packet by the sender.
    pub fn sequence(&self) -> u16 {
        u16::from_be_bytes([self.data[2], self.data[3]])
    }

    /// Media timestamp in clock-rate units.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.data[4], self.data[5], self.data[6], self.data[7]])
    }

    /// Synchronization source identifier.
    pub fn ssrc(&self) -> u32 {
        u32::from_be_bytes([self.data[8], self.data[9], self.data[10], self.data[11]])
    }

    /// Bytes taken by the CSRC list (4 per entry).
    pub fn csrc_size(&self) -> usize {
        usize::from(self.csrc_count()) << 2
    }

    /// Raw CSRC list, `None` when empty or truncated.
    pub fn csrc_data(&self) -> Option<&'a [u8]> {
        if self.csrc_count() == 0 {
            return None;
        }
        self.region(0, self.csrc_size())
    }

    /// The 4-byte extension sub-header, if present and inside the buffer.
    fn ext_header(&self) -> Option<&'a [u8]> {
        if !self.has_extension() {
            return None;
        }
        self.region(self.csrc_size(), 4)
    }

    /// Bytes of extension data, excluding the 4-byte sub-header.
    pub fn ext_size(&self) -> usize {
        self.ext_header()
            .map_or(0, |h| usize::from(u16::from_be_bytes([h[2], h[3]])) << 2)
    }

    /// Profile-defined 16 bits leading the extension sub-header.
    pub fn ext_reserved(&self) -> u16 {
        self.ext_header()
            .map_or(0, |h| u16::from_be_bytes([h[0], h[1]]))
    }

    /// Extension data after the sub-header, `None` when absent or truncated.
    pub fn ext_data(&self) -> Option<&'a [u8]> {
        self.ext_header()?;
        self.region(self.csrc_size() + 4, self.ext_size())
    }

    /// Offset of the payload after the fixed header.
    pub fn payload_offset(&self) -> usize {
        self.csrc_size()
            + if self.has_extension() {
                4 + self.ext_size()
            } else {
                0
            }
    }

    /// Trailing padding length, read from the last byte when the P bit is set.
    pub fn padding_size(&self) -> usize {
        if !self.has_padding() {
            return 0;
        }
        usize::from(self.data[self.data.len() - 1])
    }

    /// Payload length; negative when the header describes more bytes than exist.
    pub fn payload_size(&self) -> isize {
        let invalid = self.payload_offset() + self.padding_size() + RTP_HEADER_SIZE;
        self.data.len() as isize - invalid as isize
    }

    /// The payload, or `None` for a malformed packet.
    pub fn payload(&self) -> Option<&'a [u8]> {
        let size = usize::try_from(self.payload_size()).ok()?;
        self.region(self.payload_offset(), size)
    }

    fn region(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        let start = RTP_HEADER_SIZE.checked_add(offset)?;
        let end = start.checked_add(len)?;
        self.data.get(start..end)
    }
}

impl fmt::Debug for RtpHeader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RtpHeader")
            .field("version", &self.version())
            .field("padding", &self.has_padding())
            .field("extension", &self.has_extension())
            .field("csrc_count", &self.csrc_count())
            .field("marker", &self.marker())
            .field("payload_type", &self.payload_type())
            .field("sequence", &self.sequence())
            .field("timestamp", &self.timestamp())
            .field("ssrc", &format_args!("{:#010X}", self.ssrc()))
            .field("len", &self.len())
            .finish()
    }
}

impl fmt::Display for RtpHeader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version:{}", self.version())?;
        writeln!(f, "padding:{}", self.padding_size())?;
        writeln!(f, "ext:{}", self.ext_size())?;
        writeln!(f, "csrc:{}", self.csrc_size())?;
        writeln!(f, "mark:{}", u8::from(self.marker()))?;
        writeln!(f, "pt:{}", self.payload_type())?;
        writeln!(f, "seq:{}", self.sequence())?;
        writeln!(f, "stamp:{}", self.timestamp())?;
        writeln!(f, "ssrc:{}", format_ssrc(self.ssrc()))?;
        writeln!(f, "rtp size:{}", self.len())?;
        writeln!(f, "payload offset:{}", self.payload_offset())?;
        write!(f, "payload size:{}", self.payload_size())
    }
}

/// Whether `buf` looks like RTP: version 2 and a payload type outside the
/// 64–95 band that RTCP packet types occupy when multiplexed (RFC 5761 §4).
pub fn is_rtp(buf: &[u8]) -> bool {
    if buf.len() < 2 {
        return false;
    }
    let pt = buf[1] & 0x7f;
    (pt < 64 || pt >= 96) && buf[0] >> 6 == RTP_VERSION
}

/// Whether `buf` falls in the RTCP payload-type band. No version check.
pub fn is_rtcp(buf: &[u8]) -> bool {
    if buf.len() < 2 {
        return false;
    }
    let pt = buf[1] & 0x7f;
    (64..96).contains(&pt)
}

/// SSRC at bytes 8..12 with no other validation, for demultiplexing
/// buffers that have not been classified yet.
pub fn get_ssrc(buf: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = buf.get(8..12)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

/// SSRC as 8 uppercase hex digits in network byte order.
pub fn format_ssrc(ssrc: u32) -> String {
    format!("{ssrc:08X}")
}

/// Frame prefix for RTP over the RTSP connection: `'$'`, channel, 16-bit length.
pub fn make_rtp_over_tcp_prefix(size: u16, channel: u8) -> [u8; RTP_TCP_HEADER_SIZE] {
    let [hi, lo] = size.to_be_bytes();
    [b'$', channel, hi, lo]
}

/// An owned RTP packet, optionally framed for interleaved TCP delivery.
///
/// The fixed header is validated on construction, so the header accessors
/// never fail. Variable regions still have to be checked through
/// [`payload`](Self::payload) or [`payload_size`](Self::payload_size).
#[derive(Debug, Clone)]
pub struct RtpPacket {
    buffer: Vec<u8>,
    prefix: usize,
    /// Clock rate used by [`stamp_ms`](Self::stamp_ms).
    pub sample_rate: u32,
    /// NTP-synchronized presentation time in milliseconds, when known.
    pub ntp_stamp: Option<u64>,
    pub track_type: TrackType,
    /// Index of the SDP track this packet belongs to.
    pub track_index: usize,
}

impl RtpPacket {
    /// Wrap a UDP datagram carrying a bare RTP packet.
    pub fn from_datagram(buffer: Vec<u8>) -> Result<Self> {
        Self::with_prefix(buffer, 0)
    }

    /// Wrap an interleaved frame: `'$'`, channel, length, then the RTP packet.
    pub fn from_interleaved(buffer: Vec<u8>) -> Result<Self> {
        if buffer.len() < RTP_TCP_HEADER_SIZE {
            return Err(RtspError::Rtp {
                kind: RtpErrorKind::TooShort { len: buffer.len() },
            });
        }
        if buffer[0] != b'$' {
            return Err(RtspError::Rtp {
                kind: RtpErrorKind::MissingInterleavedMagic,
            });
        }
        let declared = usize::from(u16::from_be_bytes([buffer[2], buffer[3]]));
        let actual = buffer.len() - RTP_TCP_HEADER_SIZE;
        if declared != actual {
            return Err(RtspError::Rtp {
                kind: RtpErrorKind::InterleavedLengthMismatch { declared, actual },
            });
        }
        Self::with_prefix(buffer, RTP_TCP_HEADER_SIZE)
    }

    fn with_prefix(buffer: Vec<u8>, prefix: usize) -> Result<Self> {
        let len = buffer.len() - prefix;
        if len < RTP_HEADER_SIZE {
            return Err(RtspError::Rtp {
                kind: RtpErrorKind::TooShort { len },
            });
        }
        Ok(Self {
            buffer,
            prefix,
            sample_rate: 90000,
            ntp_stamp: None,
            track_type: TrackType::Invalid,
            track_index: 0,
        })
    }

    /// Frame the packet for interleaved channel `channel`.
    pub fn interleave(mut self, channel: u8) -> Result<Self> {
        if self.is_interleaved() {
            self.buffer[1] = channel;
            return Ok(self);
        }
        let len = self.buffer.len();
        let size = u16::try_from(len).map_err(|_| RtspError::Rtp {
            kind: RtpErrorKind::TooLargeForInterleave { len },
        })?;
        let mut buffer = Vec::with_capacity(RTP_TCP_HEADER_SIZE + len);
        buffer.extend_from_slice(&make_rtp_over_tcp_prefix(size, channel));
        buffer.append(&mut self.buffer);
        self.buffer = buffer;
        self.prefix = RTP_TCP_HEADER_SIZE;
        Ok(self)
    }

    /// Set the clock rate used by [`stamp_ms`](Self::stamp_ms).
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Whether the buffer starts with an interleaved prefix.
    pub fn is_interleaved(&self) -> bool {
        self.prefix == RTP_TCP_HEADER_SIZE
    }

    /// Channel byte of the interleaved prefix.
    pub fn interleaved_channel(&self) -> Option<u8> {
        self.is_interleaved().then(|| self.buffer[1])
    }

    /// View over the RTP bytes.
    pub fn header(&self) -> RtpHeader<'_> {
        RtpHeader {
            data: self.rtp_bytes(),
        }
    }

    /// Sequence number.
    pub fn seq(&self) -> u16 {
        self.header().sequence()
    }

    /// RTP timestamp.
    pub fn stamp(&self) -> u32 {
        self.header().timestamp()
    }

    /// Synchronization source identifier.
    pub fn ssrc(&self) -> u32 {
        self.header().ssrc()
    }

    /// Presentation time in milliseconds: the NTP stamp when one was supplied,
    /// else the RTP timestamp scaled by [`sample_rate`](Self::sample_rate).
    pub fn stamp_ms(&self) -> u64 {
        match self.ntp_stamp {
            Some(ntp) => ntp,
            None => (u64::from(self.stamp()) * 1000)
                .checked_div(u64::from(self.sample_rate))
                .unwrap_or(0),
        }
    }

    /// Payload bytes, `None` for a malformed packet.
    pub fn payload(&self) -> Option<&[u8]> {
        self.header().payload()
    }

    /// See [`RtpHeader::payload_size`].
    pub fn payload_size(&self) -> isize {
        self.header().payload_size()
    }

    /// Whole buffer, interleaved prefix included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// The RTP packet without any interleaved prefix.
    pub fn rtp_bytes(&self) -> &[u8] {
        &self.buffer[self.prefix..]
    }

    /// Take back the whole buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

impl fmt::Display for RtpPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.header(), f)
    }
}

/// Sender-side RTP fixed header state.
///
/// - **Sequence number**: 16-bit, wrapping, incremented on every packet.
/// - **Timestamp**: held as u64 so duration math does not wrap; the lower
///   32 bits go on the wire.
/// - **SSRC**: random by default (RFC 3550 §8.1).
///
/// Padding, extension and CSRC count are always 0.
#[derive(Debug)]
pub struct RtpHeaderWriter {
    pub pt: u8,
    pub ssrc: u32,
    sequence: u16,
    timestamp: u64,
}

impl RtpHeaderWriter {
    /// Writer starting at sequence 0 and timestamp 0.
    pub fn new(pt: u8, ssrc: u32) -> Self {
        tracing::debug!(
            pt,
            ssrc = %format_ssrc(ssrc),
            "RTP header writer created"
        );
        Self {
            pt,
            ssrc,
            sequence: 0,
            timestamp: 0,
        }
    }

    /// Writer with a random SSRC (RFC 3550 §8.1).
    pub fn with_random_ssrc(pt: u8) -> Self {
        let ssrc = rand::rng().random::<u32>();
        Self::new(pt, ssrc)
    }

    /// Sequence number of the next packet.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Current timestamp, not truncated to 32 bits.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Serialize the fixed header and advance the sequence number.
    pub fn write(&mut self, marker: bool) -> [u8; RTP_HEADER_SIZE] {
        let mut header = [0u8; RTP_HEADER_SIZE];
        header[0] = RTP_VERSION << 6;
        header[1] = (u8::from(marker) << 7) | (self.pt & 0x7f);
        header[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        header[4..8].copy_from_slice(&(self.timestamp as u32).to_be_bytes());
        header[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        self.sequence = self.sequence.wrapping_add(1);
        header
    }

    /// Write a header followed by `payload` into a new packet.
    pub fn packet(&mut self, marker: bool, payload: &[u8]) -> RtpPacket {
        let mut buffer = Vec::with_capacity(RTP_HEADER_SIZE + payload.len());
        buffer.extend_from_slice(&self.write(marker));
        buffer.extend_from_slice(payload);
        RtpPacket {
            buffer,
            prefix: 0,
            sample_rate: 90000,
            ntp_stamp: None,
            track_type: TrackType::Invalid,
            track_index: 0,
        }
    }

    /// Move the timestamp forward by `increment` clock ticks.
    pub fn advance_timestamp(&mut self, increment: u32) {
        self.timestamp = self.timestamp.wrapping_add(u64::from(increment));
    }
}
