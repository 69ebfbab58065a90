//! SDP generation for DESCRIBE responses (RFC 4566 / RFC 8866).
//!
//! A session description is a [`TitleSdp`] followed by one [`DefaultSdp`]
//! per track:
//!
//! ```text
//! v=0                                          ← protocol version
//! o=- 0 0 IN IP4 0.0.0.0                       ← origin
//! s=Streamed by rtsp-media                     ← session name
//! c=IN IP4 0.0.0.0                             ← connection address
//! t=0 0                                        ← timing
//! a=range:npt=now-                             ← live (or npt=0-<secs>)
//! a=control:*                                  ← aggregate control
//! m=video 0 RTP/AVP 96                         ← media description
//! b=AS:2000                                    ← bit rate in kbit/s
//! a=rtpmap:96 H264/90000                       ← dynamic payload types only
//! ```

use crate::media::payload::DYNAMIC_PAYLOAD_TYPE_MIN;
use crate::media::{MediaTrack, TrackType};

/// Server software named in the default `s=` line.
pub const SERVER_NAME: &str = "rtsp-media";

/// A generated SDP fragment.
pub trait Sdp {
    /// SDP text, CRLF-terminated lines.
    fn sdp(&self) -> &str;

    /// Payload type advertised by this fragment, 0 for the title block.
    fn payload_type(&self) -> u8;

    /// Clock rate advertised by this fragment, 0 for the title block.
    fn sample_rate(&self) -> u32;
}

/// Session-level block.
#[derive(Debug, Clone)]
pub struct TitleSdp {
    text: String,
    duration: f32,
}

impl TitleSdp {
    /// Default header, SDP version 0. `duration <= 0` describes a live stream.
    pub fn new(duration: f32) -> Self {
        Self::with_header(duration, &[], 0)
    }

    /// Emit `header` lines (`(type, value)`, e.g. `("s", "Camera")`) in place of
    /// the default `o=`/`s=`/`c=`/`t=` block.
    pub fn with_header(duration: f32, header: &[(&str, &str)], version: u32) -> Self {
        let mut sdp: Vec<String> = Vec::new();
        sdp.push(format!("v={version}"));

        if header.is_empty() {
            sdp.push("o=- 0 0 IN IP4 0.0.0.0".to_string());
            sdp.push(format!("s=Streamed by {SERVER_NAME}"));
            sdp.push("c=IN IP4 0.0.0.0".to_string());
            sdp.push("t=0 0".to_string());
        } else {
            sdp.extend(header.iter().map(|(key, value)| format!("{key}={value}")));
        }

        let duration = if duration <= 0.0 {
            sdp.push("a=range:npt=now-".to_string());
            0.0
        } else {
            sdp.push(format!("a=range:npt=0-{duration}"));
            duration
        };
        sdp.push("a=control:*".to_string());

        Self {
            text: format!("{}\r\n", sdp.join("\r\n")),
            duration,
        }
    }

    /// On-demand duration in seconds, 0 for live.
    pub fn duration(&self) -> f32 {
        self.duration
    }
}

impl Sdp for TitleSdp {
    fn sdp(&self) -> &str {
        &self.text
    }

    fn payload_type(&self) -> u8 {
        0
    }

    fn sample_rate(&self) -> u32 {
        0
    }
}

/// Media block for one negotiated track.
///
/// Static payload types (< 96) omit `a=rtpmap`: the payload table implies
/// the codec, clock rate and channel count.
#[derive(Debug, Clone)]
pub struct DefaultSdp {
    text: String,
    payload_type: u8,
    sample_rate: u32,
}

impl DefaultSdp {
    pub fn new<T: MediaTrack + ?Sized>(payload_type: u8, track: &T) -> Self {
        let track_type = track.track_type();
        let sample_rate = if track_type == TrackType::Video {
            90000
        } else {
            track.sample_rate()
        };

        let mut sdp: Vec<String> = Vec::new();
        sdp.push(format!("m={track_type} 0 RTP/AVP {payload_type}"));

        let bitrate = track.bit_rate() >> 10;
        if bitrate != 0 {
            sdp.push(format!("b=AS:{bitrate}"));
        }

        if payload_type >= DYNAMIC_PAYLOAD_TYPE_MIN {
            let mut rtpmap = format!(
                "a=rtpmap:{} {}/{}",
                payload_type,
                track.codec_name(),
                sample_rate
            );
            if track_type == TrackType::Audio {
                rtpmap.push_str(&format!("/{}", track.channels()));
            }
            sdp.push(rtpmap);
        }

        Self {
            text: format!("{}\r\n", sdp.join("\r\n")),
            payload_type,
            sample_rate,
        }
    }
}

impl Sdp for DefaultSdp {
    fn sdp(&self) -> &str {
        &self.text
    }

    fn payload_type(&self) -> u8 {
        self.payload_type
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{CodecId, TrackInfo};

    #[test]
    fn live_title() {
        let title = TitleSdp::new(0.0);
        assert_eq!(
            title.sdp(),
            "v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns=Streamed by rtsp-media\r\nc=IN IP4 0.0.0.0\r\nt=0 0\r\na=range:npt=now-\r\na=control:*\r\n"
        );
        assert_eq!(title.duration(), 0.0);
    }

    #[test]
    fn on_demand_title_with_header() {
        let title = TitleSdp::with_header(
            12.5,
            &[("o", "- 1 1 IN IP4 10.0.0.1"), ("s", "Clip")],
            0,
        );
        let sdp = title.sdp();
        assert!(sdp.starts_with("v=0\r\no=- 1 1 IN IP4 10.0.0.1\r\ns=Clip\r\n"));
        assert!(!sdp.contains("c=IN IP4 0.0.0.0"));
        assert!(sdp.contains("a=range:npt=0-12.5\r\n"));
        assert!(sdp.ends_with("a=control:*\r\n"));
        assert_eq!(title.duration(), 12.5);
    }

    #[test]
    fn negative_duration_is_live() {
        assert!(TitleSdp::new(-3.0).sdp().contains("a=range:npt=now-\r\n"));
    }

    #[test]
    fn dynamic_video() {
        let track = TrackInfo::video(CodecId::H264).with_bit_rate(2 * 1024 * 1024);
        let sdp = DefaultSdp::new(96, &track);
        assert_eq!(
            sdp.sdp(),
            "m=video 0 RTP/AVP 96\r\nb=AS:2048\r\na=rtpmap:96 H264/90000\r\n"
        );
        assert_eq!(sdp.sample_rate(), 90000);
        assert_eq!(sdp.payload_type(), 96);
    }

    #[test]
    fn dynamic_audio_has_channels() {
        let track = TrackInfo::audio(CodecId::Opus, 48000, 2);
        let sdp = DefaultSdp::new(111, &track);
        assert_eq!(sdp.sdp(), "m=audio 0 RTP/AVP 111\r\na=rtpmap:111 opus/48000/2\r\n");
    }

    #[test]
    fn static_payload_omits_rtpmap() {
        let track = TrackInfo::audio(CodecId::G711A, 8000, 1);
        let sdp = DefaultSdp::new(8, &track);
        assert_eq!(sdp.sdp(), "m=audio 0 RTP/AVP 8\r\n");
        assert_eq!(sdp.sample_rate(), 8000);
    }
}
