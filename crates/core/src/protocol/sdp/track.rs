use std::collections::BTreeMap;
use std::fmt;

use super::builder::{Sdp, TitleSdp};
use crate::media::{TrackType, payload};

/// Payload type of a track whose `m=` line has not set one (the title block).
///
/// A peer advertising a real payload type 255 is indistinguishable from
/// this value; such attributes are treated as unfiltered.
pub const PAYLOAD_TYPE_UNSET: u8 = 0xff;

/// One media description of an SDP blob, or the session-level title block.
///
/// Fields are resolved by [`SdpParser::load`](super::SdpParser::load) and
/// not mutated afterwards; the parser hands tracks out as `Arc<SdpTrack>`.
#[derive(Debug, Clone, PartialEq)]
pub struct SdpTrack {
    pub track_type: TrackType,
    /// RTP payload type, [`PAYLOAD_TYPE_UNSET`] for the title block.
    pub payload_type: u8,
    /// Clock rate in Hz.
    pub sample_rate: u32,
    pub channels: u32,
    /// Port from the `m=` line.
    pub port: u16,
    /// Raw `t=` value.
    pub time: String,
    /// Raw `b=` value, e.g. `AS:128`.
    pub bandwidth: String,
    /// `a=range` start in seconds.
    pub start: f32,
    /// `a=range` end in seconds, 0 when open-ended.
    pub end: f32,
    /// `end - start`; 0 or less means live.
    pub duration: f32,
    /// Encoding name from the surviving `a=rtpmap`.
    pub codec: String,
    /// Format parameters from the surviving `a=fmtp`, payload type stripped.
    pub fmtp: String,
    /// Last `a=control` value.
    pub control: String,
    /// `a=` lines in input order; names may repeat.
    pub attributes: Vec<(String, String)>,
    /// Other lines keyed by their type letter (`v`, `o`, `s`, `c`, ...). Last one wins.
    pub other: BTreeMap<char, String>,
}

impl Default for SdpTrack {
    fn default() -> Self {
        Self {
            track_type: TrackType::Invalid,
            payload_type: PAYLOAD_TYPE_UNSET,
            sample_rate: 0,
            channels: 0,
            port: 0,
            time: String::new(),
            bandwidth: String::new(),
            start: 0.0,
            end: 0.0,
            duration: 0.0,
            codec: String::new(),
            fmtp: String::new(),
            control: String::new(),
            attributes: Vec::new(),
            other: BTreeMap::new(),
        }
    }
}

impl SdpTrack {
    pub(crate) fn title() -> Self {
        Self {
            track_type: TrackType::Title,
            ..Self::default()
        }
    }

    /// Static payload-table name of [`payload_type`](Self::payload_type).
    pub fn name(&self) -> &'static str {
        payload::name(self.payload_type)
    }

    /// First value of attribute `name`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every value of attribute `name`, in input order.
    pub fn attributes<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.attributes
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_live(&self) -> bool {
        self.duration <= 0.0
    }

    /// Absolute control URL for this track.
    ///
    /// A control value that already carries a scheme is returned as is,
    /// otherwise it is appended to `base_url`.
    pub fn control_url(&self, base_url: &str) -> String {
        if self.control.contains("://") {
            return self.control.clone();
        }
        format!("{}/{}", base_url, self.control)
    }

    /// Serialize this track, advertising `port` on its `m=` line.
    ///
    /// The title block is regenerated by [`TitleSdp`] from its duration.
    /// Media blocks emit attributes in input order with the last `control`
    /// moved to the end.
    pub fn to_sdp(&self, port: u16) -> String {
        match self.track_type {
            TrackType::Title => TitleSdp::new(self.duration).sdp().to_string(),
            TrackType::Audio | TrackType::Video => {
                let mut sdp: Vec<String> = Vec::new();
                sdp.push(format!(
                    "m={} {} RTP/AVP {}",
                    self.track_type, port, self.payload_type
                ));
                if !self.bandwidth.is_empty() {
                    sdp.push(format!("b={}", self.bandwidth));
                }
                let mut control = None;
                for (name, value) in &self.attributes {
                    if name == "control" {
                        control = Some(value);
                        continue;
                    }
                    sdp.push(attribute_line(name, value));
                }
                if let Some(value) = control {
                    sdp.push(attribute_line("control", value));
                }
                format!("{}\r\n", sdp.join("\r\n"))
            }
            TrackType::Invalid => String::new(),
        }
    }
}

/// Serializes with port 0; real ports are negotiated by SETUP.
impl fmt::Display for SdpTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sdp(0))
    }
}

fn attribute_line(name: &str, value: &str) -> String {
    if value.is_empty() {
        format!("a={name}")
    } else {
        format!("a={name}:{value}")
    }
}
