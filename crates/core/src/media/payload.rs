//! Static RTP payload types (RFC 3551 §6).
//!
//! Payload types below 96 carry their clock rate and channel count
//! implicitly, so an SDP offer may omit `a=rtpmap` for them. Dynamic types
//! (96–127) must be described by `a=rtpmap` and never appear here.
//!
//! Lookups by payload-type number never fail: unknown numbers resolve to a
//! 90 kHz, single-channel, [`TrackType::Invalid`] description.

use super::{CodecId, MediaTrack, TrackType};

/// First dynamic payload type (RFC 3551 §3).
pub const DYNAMIC_PAYLOAD_TYPE_MIN: u8 = 96;

/// Clock rate assumed for payload types missing from the table.
pub const DEFAULT_CLOCK_RATE: u32 = 90000;

/// One statically assigned payload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadEntry {
    pub name: &'static str,
    pub track_type: TrackType,
    pub payload_type: u8,
    pub clock_rate: u32,
    pub channels: u32,
    pub codec: CodecId,
}

macro_rules! payload_table {
    ($($konst:ident => $name:literal, $kind:ident, $pt:literal, $rate:literal, $channels:literal, $codec:ident;)*) => {
        $(
            const $konst: PayloadEntry = PayloadEntry {
                name: $name,
                track_type: TrackType::$kind,
                payload_type: $pt,
                clock_rate: $rate,
                channels: $channels,
                codec: CodecId::$codec,
            };
        )*

        /// Every static payload type, in ascending payload-type order.
        pub static PAYLOAD_TABLE: &[PayloadEntry] = &[$($konst),*];

        /// Look up a payload-type number.
        pub fn entry(pt: u8) -> Option<&'static PayloadEntry> {
            match pt {
                $($pt => Some(&$konst),)*
                _ => None,
            }
        }
    };
}

payload_table! {
    PCMU       => "PCMU",       Audio, 0,  8000,  1, G711U;
    GSM        => "GSM",        Audio, 3,  8000,  1, Invalid;
    G723       => "G723",       Audio, 4,  8000,  1, Invalid;
    DVI4_8000  => "DVI4_8000",  Audio, 5,  8000,  1, Invalid;
    DVI4_16000 => "DVI4_16000", Audio, 6,  16000, 1, Invalid;
    LPC        => "LPC",        Audio, 7,  8000,  1, Invalid;
    PCMA       => "PCMA",       Audio, 8,  8000,  1, G711A;
    G722       => "G722",       Audio, 9,  8000,  1, Invalid;
    L16_STEREO => "L16_Stereo", Audio, 10, 44100, 2, L16;
    L16_MONO   => "L16_Mono",   Audio, 11, 44100, 1, Invalid;
    QCELP      => "QCELP",      Audio, 12, 8000,  1, Invalid;
    CN         => "CN",         Audio, 13, 8000,  1, Invalid;
    MPA        => "MPA",        Audio, 14, 90000, 1, Invalid;
    G728       => "G728",       Audio, 15, 8000,  1, Invalid;
    DVI4_11025 => "DVI4_11025", Audio, 16, 11025, 1, Invalid;
    DVI4_22050 => "DVI4_22050", Audio, 17, 22050, 1, Invalid;
    G729       => "G729",       Audio, 18, 8000,  1, Invalid;
    CELB       => "CelB",       Video, 25, 90000, 1, Invalid;
    JPEG       => "JPEG",       Video, 26, 90000, 1, Jpeg;
    NV         => "nv",         Video, 28, 90000, 1, Invalid;
    H261       => "H261",       Video, 31, 90000, 1, Invalid;
    MPV        => "MPV",        Video, 32, 90000, 1, Invalid;
    MP2T       => "MP2T",       Video, 33, 90000, 1, Invalid;
    H263       => "H263",       Video, 34, 90000, 1, Invalid;
}

pub fn clock_rate(pt: u8) -> u32 {
    entry(pt).map_or(DEFAULT_CLOCK_RATE, |e| e.clock_rate)
}

pub fn channels(pt: u8) -> u32 {
    entry(pt).map_or(1, |e| e.channels)
}

pub fn track_type(pt: u8) -> TrackType {
    entry(pt).map_or(TrackType::Invalid, |e| e.track_type)
}

pub fn name(pt: u8) -> &'static str {
    entry(pt).map_or("unknown payload type", |e| e.name)
}

pub fn codec_id(pt: u8) -> CodecId {
    entry(pt).map_or(CodecId::Invalid, |e| e.codec)
}

/// The static payload type statically assigned to `codec`, if any.
///
/// Table rows without a codec mapping are never matched.
pub fn by_codec(codec: CodecId) -> Option<&'static PayloadEntry> {
    if codec == CodecId::Invalid {
        return None;
    }
    PAYLOAD_TABLE.iter().find(|e| e.codec == codec)
}

/// Clock rate for `codec`, or [`DEFAULT_CLOCK_RATE`] when it has no static payload type.
pub fn clock_rate_by_codec(codec: CodecId) -> u32 {
    match by_codec(codec) {
        Some(e) => e.clock_rate,
        None => {
            tracing::warn!(%codec, "no static payload type for codec, assuming 90 kHz");
            DEFAULT_CLOCK_RATE
        }
    }
}

/// Static payload type usable for `track`.
///
/// Returns `None` when the codec has no static assignment, or when an audio
/// track's sample rate or channel count differs from the table: the payload
/// type would then misdescribe the stream and dynamic signaling is required.
pub fn payload_type_for<T: MediaTrack + ?Sized>(track: &T) -> Option<u8> {
    let e = by_codec(track.codec_id())?;
    if track.track_type() == TrackType::Audio
        && (track.sample_rate() != e.clock_rate || track.channels() != e.channels)
    {
        return None;
    }
    Some(e.payload_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::TrackInfo;

    #[test]
    fn table_is_sorted_and_unique() {
        for pair in PAYLOAD_TABLE.windows(2) {
            assert!(pair[0].payload_type < pair[1].payload_type);
        }
        assert!(PAYLOAD_TABLE.iter().all(|e| e.payload_type < DYNAMIC_PAYLOAD_TYPE_MIN));
    }

    #[test]
    fn lookup_by_number() {
        assert_eq!(clock_rate(0), 8000);
        assert_eq!(channels(10), 2);
        assert_eq!(track_type(26), TrackType::Video);
        assert_eq!(name(8), "PCMA");
        assert_eq!(codec_id(0), CodecId::G711U);
    }

    #[test]
    fn unknown_number_defaults() {
        assert_eq!(clock_rate(96), 90000);
        assert_eq!(channels(96), 1);
        assert_eq!(track_type(2), TrackType::Invalid);
        assert_eq!(codec_id(127), CodecId::Invalid);
        assert_eq!(name(255), "unknown payload type");
    }

    #[test]
    fn lookup_by_codec() {
        assert_eq!(by_codec(CodecId::G711A).map(|e| e.payload_type), Some(8));
        assert_eq!(clock_rate_by_codec(CodecId::G711U), 8000);
        assert_eq!(clock_rate_by_codec(CodecId::H264), 90000);
        assert!(by_codec(CodecId::Invalid).is_none());
    }

    #[test]
    fn payload_type_requires_matching_audio_params() {
        assert_eq!(payload_type_for(&TrackInfo::audio(CodecId::G711U, 8000, 1)), Some(0));
        assert_eq!(payload_type_for(&TrackInfo::audio(CodecId::G711U, 16000, 1)), None);
        assert_eq!(payload_type_for(&TrackInfo::audio(CodecId::G711A, 8000, 2)), None);
        assert_eq!(payload_type_for(&TrackInfo::video(CodecId::Jpeg)), Some(26));
        assert_eq!(payload_type_for(&TrackInfo::video(CodecId::H264)), None);
    }
}
