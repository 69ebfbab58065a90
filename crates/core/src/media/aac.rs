//! AAC sample rate from SDP format parameters (RFC 3640 §4.1).
//!
//! Some servers offer `a=rtpmap:97 mpeg4-generic` without a clock rate, so the
//! rate can only be read from the AudioSpecificConfig carried hex-encoded in
//! the `config=` parameter of `a=fmtp`.

use crate::protocol::sdp::{SampleRateResolver, SdpTrack};

use super::CodecId;

/// ISO/IEC 14496-3 §1.6.3.4 sampling frequency index table.
const SAMPLING_FREQUENCIES: [u32; 13] = [
    96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025, 8_000,
    7_350,
];

/// Resolves the sample rate of `mpeg4-generic` tracks from their `config=`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AacConfigResolver;

impl SampleRateResolver for AacConfigResolver {
    fn sample_rate(&self, track: &SdpTrack) -> Option<u32> {
        if CodecId::from_name(&track.codec) != CodecId::Aac {
            return None;
        }
        sample_rate_from_fmtp(&track.fmtp)
    }
}

/// Sample rate encoded by the `config=` parameter of an fmtp string.
pub fn sample_rate_from_fmtp(fmtp: &str) -> Option<u32> {
    let config = fmtp
        .split(';')
        .filter_map(|p| p.trim().split_once('='))
        .find(|(key, _)| key.eq_ignore_ascii_case("config"))
        .map(|(_, value)| value.trim())?;
    let raw = hex::decode(config).ok()?;
    let sample_rate = audio_specific_config_sample_rate(&raw);
    if sample_rate.is_none() {
        tracing::trace!(config, "unusable AudioSpecificConfig");
    }
    sample_rate
}

fn audio_specific_config_sample_rate(raw: &[u8]) -> Option<u32> {
    let mut r = BitReader { data: raw, pos: 0 };
    if r.read(5)? == 31 {
        r.read(6)?;
    }
    match r.read(4)? {
        0xf => r.read(24),
        index => SAMPLING_FREQUENCIES.get(index as usize).copied(),
    }
}

/// Big-endian bit reader over a byte slice.
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl BitReader<'_> {
    fn read(&mut self, bits: usize) -> Option<u32> {
        let mut value = 0u32;
        for _ in 0..bits {
            let byte = *self.data.get(self.pos / 8)?;
            let bit = (byte >> (7 - self.pos % 8)) & 1;
            value = (value << 1) | u32::from(bit);
            self.pos += 1;
        }
        Some(value)
    }
}
