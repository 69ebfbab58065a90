//! Session description handling (RFC 4566 / RFC 8866).
//!
//! RTSP carries media descriptions as SDP in DESCRIBE responses and
//! ANNOUNCE requests:
//!
//! ```text
//! v=0
//! o=- 0 0 IN IP4 127.0.0.1
//! s=Camera
//! t=0 0
//! a=range:npt=0-
//! m=video 0 RTP/AVP 96
//! a=rtpmap:96 H264/90000
//! a=fmtp:96 packetization-mode=1
//! a=control:trackID=0
//! ```
//!
//! Lines before the first `m=` form the session-level title block; each
//! `m=` line opens a new track. [`sdp::SdpParser`] reads received
//! descriptions, [`sdp::TitleSdp`] and [`sdp::DefaultSdp`] generate them.

pub mod sdp;

pub use sdp::{SdpParser, SdpTrack};
