pub mod config;
pub mod error;
pub mod media;
pub mod protocol;
pub mod transport;

pub use config::{ConfigSource, PortRange};
pub use error::{Result, RtspError};
pub use media::rtp::{RtpHeader, RtpPacket};
pub use media::{CodecId, MediaTrack, TrackType};
pub use protocol::{SdpParser, SdpTrack};
pub use transport::{PortPair, PortPairPool, Protocol, SocketPair, SocketPairAllocator};
