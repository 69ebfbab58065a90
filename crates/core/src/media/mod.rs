//! Media descriptors and the RTP wire format.
//!
//! This module provides the [`MediaTrack`] trait through which the rest of
//! the stack describes a negotiated track, the static payload-type table
//! ([`payload`]) and the RTP header codec ([`rtp`]).
//!
//! ## RTP overview (RFC 3550)
//!
//! Every RTP packet carries a 12-byte fixed header ([`rtp::RtpHeader`])
//! containing:
//!
//! - **Payload type** (7-bit): static (RFC 3551 table) or dynamic (96–127).
//! - **Sequence number** (16-bit, wrapping): for reordering and loss detection.
//! - **Timestamp** (32-bit): media clock, typically 90 kHz for video.
//! - **SSRC** (32-bit): identifies the sender.
//!
//! ## Supported codecs
//!
//! | Codec | rtpmap name | Static PT |
//! |-------|-------------|-----------|
//! | H.264 | `H264` | - |
//! | H.265 | `H265` | - |
//! | AAC | `mpeg4-generic` | - |
//! | G.711 µ-law | `PCMU` | 0 |
//! | G.711 A-law | `PCMA` | 8 |
//! | Opus | `opus` | - |
//! | L16 | `L16` | 10, 11 |
//! | JPEG | `JPEG` | 26 |

pub mod aac;
pub mod payload;
pub mod rtp;

use std::fmt;

/// Kind of an SDP media description.
///
/// `Title` is the session-level block that precedes the first `m=` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackType {
    Invalid,
    Video,
    Audio,
    Title,
}

impl TrackType {
    /// Map the `<media>` token of an `m=` line.
    pub fn from_media(media: &str) -> Self {
        match media {
            "" => TrackType::Title,
            "video" => TrackType::Video,
            "audio" => TrackType::Audio,
            _ => TrackType::Invalid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackType::Invalid => "invalid",
            TrackType::Video => "video",
            TrackType::Audio => "audio",
            TrackType::Title => "title",
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Codec identifier shared by the payload table and track descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    Invalid,
    H264,
    H265,
    Vp8,
    Vp9,
    Av1,
    Jpeg,
    Aac,
    G711A,
    G711U,
    Opus,
    L16,
}

impl CodecId {
    /// Encoding name as written in `a=rtpmap`.
    pub fn name(&self) -> &'static str {
        match self {
            CodecId::Invalid => "invalid",
            CodecId::H264 => "H264",
            CodecId::H265 => "H265",
            CodecId::Vp8 => "VP8",
            CodecId::Vp9 => "VP9",
            CodecId::Av1 => "AV1",
            CodecId::Jpeg => "JPEG",
            CodecId::Aac => "mpeg4-generic",
            CodecId::G711A => "PCMA",
            CodecId::G711U => "PCMU",
            CodecId::Opus => "opus",
            CodecId::L16 => "L16",
        }
    }

    /// Resolve an `a=rtpmap` encoding name (case-insensitive).
    pub fn from_name(name: &str) -> Self {
        const ALL: [CodecId; 11] = [
            CodecId::H264,
            CodecId::H265,
            CodecId::Vp8,
            CodecId::Vp9,
            CodecId::Av1,
            CodecId::Jpeg,
            CodecId::Aac,
            CodecId::G711A,
            CodecId::G711U,
            CodecId::Opus,
            CodecId::L16,
        ];
        ALL.into_iter()
            .find(|codec| codec.name().eq_ignore_ascii_case(name))
            .unwrap_or(CodecId::Invalid)
    }

    pub fn track_type(&self) -> TrackType {
        match self {
            CodecId::H264
            | CodecId::H265
            | CodecId::Vp8
            | CodecId::Vp9
            | CodecId::Av1
            | CodecId::Jpeg => TrackType::Video,
            CodecId::Aac | CodecId::G711A | CodecId::G711U | CodecId::Opus | CodecId::L16 => {
                TrackType::Audio
            }
            CodecId::Invalid => TrackType::Invalid,
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A negotiated media track as seen by the transport layer.
///
/// The payload table cross-checks static payload types against it and the
/// SDP builders describe it. Codec-specific depacketizers implement this
/// for their own track objects.
pub trait MediaTrack {
    fn codec_id(&self) -> CodecId;

    fn track_type(&self) -> TrackType {
        self.codec_id().track_type()
    }

    /// Encoding name for `a=rtpmap`.
    fn codec_name(&self) -> &str {
        self.codec_id().name()
    }

    /// Bit rate in bits per second, `0` when unknown.
    fn bit_rate(&self) -> u32 {
        0
    }

    /// Audio sample rate in Hz. Only meaningful for audio tracks.
    fn sample_rate(&self) -> u32;

    /// Audio channel count. Only meaningful for audio tracks.
    fn channels(&self) -> u32;
}

/// Plain-data [`MediaTrack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub codec: CodecId,
    pub sample_rate: u32,
    pub channels: u32,
    pub bit_rate: u32,
}

impl TrackInfo {
    pub fn video(codec: CodecId) -> Self {
        Self {
            codec,
            sample_rate: 90000,
            channels: 0,
            bit_rate: 0,
        }
    }

    pub fn audio(codec: CodecId, sample_rate: u32, channels: u32) -> Self {
        Self {
            codec,
            sample_rate,
            channels,
            bit_rate: 0,
        }
    }

    pub fn with_bit_rate(mut self, bit_rate: u32) -> Self {
        self.bit_rate = bit_rate;
        self
    }
}

impl MediaTrack for TrackInfo {
    fn codec_id(&self) -> CodecId {
        self.codec
    }

    fn bit_rate(&self) -> u32 {
        self.bit_rate
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u32 {
        self.channels
    }
}
