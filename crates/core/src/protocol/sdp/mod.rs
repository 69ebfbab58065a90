//! SDP (Session Description Protocol) parsing and generation (RFC 4566).
//!
//! [`SdpParser`] turns an offer into one title [`SdpTrack`] followed by one
//! track per accepted `m=` line. Only the attributes this stack consumes are
//! interpreted (`range`, `rtpmap`, `fmtp`, `control`); every other line is
//! kept verbatim on its track.
//!
//! Offers from real peers are often sloppy, so parsing never fails: lines
//! that do not fit the grammar are dropped and the rest is used.

pub mod builder;
pub mod track;

use std::fmt;
use std::sync::Arc;

use crate::media::aac::AacConfigResolver;
use crate::media::{TrackType, payload};

pub use builder::{DefaultSdp, Sdp, TitleSdp};
pub use track::{PAYLOAD_TYPE_UNSET, SdpTrack};

/// Recovers an audio sample rate that `a=rtpmap` did not provide.
///
/// Implemented by the codec layer; some codecs carry the rate only in
/// their format parameters.
pub trait SampleRateResolver {
    fn sample_rate(&self, track: &SdpTrack) -> Option<u32>;
}

/// Parsed SDP session: the title track first, then media tracks in input order.
#[derive(Debug, Clone, Default)]
pub struct SdpParser {
    tracks: Vec<Arc<SdpTrack>>,
}

impl SdpParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `sdp` with the built-in AAC sample-rate resolver.
    pub fn parse(sdp: &str) -> Self {
        let mut parser = Self::new();
        parser.load(sdp);
        parser
    }

    /// Replace the current tracks with those of `sdp`.
    pub fn load(&mut self, sdp: &str) {
        self.load_with(sdp, &AacConfigResolver);
    }

    /// Like [`load`](Self::load), resolving missing audio sample rates through `resolver`.
    pub fn load_with(&mut self, sdp: &str, resolver: &dyn SampleRateResolver) {
        let mut tracks = Vec::new();
        let mut track = SdpTrack::title();
        // False while collecting lines for an `m=` line that did not parse.
        let mut keep = true;

        for line in sdp.split('\n') {
            let line = line.trim();
            let bytes = line.as_bytes();
            if bytes.len() < 2 || bytes[1] != b'=' {
                if !line.is_empty() {
                    tracing::trace!(line, "ignoring SDP line");
                }
                continue;
            }
            let value = &line[2..];
            match bytes[0] {
                b't' => track.time = value.to_string(),
                b'b' => track.bandwidth = value.to_string(),
                b'm' => {
                    let previous = std::mem::take(&mut track);
                    if keep {
                        tracks.push(previous);
                    }
                    keep = match MediaLine::parse(value) {
                        Some(media) => {
                            tracing::trace!(
                                media = media.media,
                                proto = media.proto,
                                port = media.port,
                                port_count = ?media.port_count,
                                "media description"
                            );
                            track.track_type = TrackType::from_media(media.media);
                            track.port = media.port;
                            track.payload_type = media.payload_type;
                            track.sample_rate = payload::clock_rate(media.payload_type);
                            track.channels = payload::channels(media.payload_type);
                            true
                        }
                        None => {
                            tracing::trace!(line, "dropping unparseable media description");
                            false
                        }
                    };
                }
                b'a' => {
                    let (name, value) = match value.split_once(':') {
                        Some((name, value)) if !name.is_empty() => (name, value),
                        _ => (value, ""),
                    };
                    track
                        .attributes
                        .push((name.to_string(), value.to_string()));
                }
                other => {
                    track.other.insert(char::from(other), value.to_string());
                }
            }
        }
        if keep {
            tracks.push(track);
        }

        for track in &mut tracks {
            resolve(track, resolver);
        }
        self.tracks = tracks.into_iter().map(Arc::new).collect();
    }

    /// Whether the session has at least one audio or video track.
    pub fn available(&self) -> bool {
        self.track(TrackType::Audio).is_some() || self.track(TrackType::Video).is_some()
    }

    /// First track of `track_type`.
    pub fn track(&self, track_type: TrackType) -> Option<Arc<SdpTrack>> {
        self.tracks
            .iter()
            .find(|t| t.track_type == track_type)
            .cloned()
    }

    /// Every parsed track, title first.
    pub fn tracks(&self) -> &[Arc<SdpTrack>] {
        &self.tracks
    }

    /// The first audio and first video track, in input order. Later tracks
    /// of an already selected kind are ignored.
    pub fn available_tracks(&self) -> Vec<Arc<SdpTrack>> {
        let mut audio = false;
        let mut video = false;
        let mut ret = Vec::new();
        for track in &self.tracks {
            let seen = match track.track_type {
                TrackType::Audio => &mut audio,
                TrackType::Video => &mut video,
                _ => continue,
            };
            if !*seen {
                *seen = true;
                ret.push(track.clone());
            }
        }
        ret
    }

    /// Aggregate control URL: the session-level `a=control` if it is absolute,
    /// else `url` itself.
    pub fn control_url(&self, url: &str) -> String {
        match self.track(TrackType::Title) {
            Some(title) if title.control.contains("://") => title.control.clone(),
            _ => url.to_string(),
        }
    }
}

/// Title, then video, then audio, regardless of input order. When a kind
/// appears more than once the last track of that kind is written.
impl fmt::Display for SdpParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for track_type in [TrackType::Title, TrackType::Video, TrackType::Audio] {
            if let Some(track) = self.tracks.iter().rfind(|t| t.track_type == track_type) {
                write!(f, "{track}")?;
            }
        }
        Ok(())
    }
}

fn resolve(track: &mut SdpTrack, resolver: &dyn SampleRateResolver) {
    if let Some(range) = track.attribute("range").and_then(parse_range) {
        (track.start, track.end) = range;
        track.duration = track.end - track.start;
    }

    if track.track_type != TrackType::Title {
        prune_by_payload_type(track, "rtpmap", |track, value| {
            match Rtpmap::parse(value) {
                Some(Rtpmap {
                    codec,
                    sample_rate,
                    channels: Some(channels),
                    ..
                }) => {
                    track.codec = codec.to_string();
                    track.sample_rate = sample_rate;
                    track.channels = channels;
                }
                Some(Rtpmap {
                    payload_type,
                    codec,
                    sample_rate,
                    channels: None,
                }) => {
                    track.payload_type = payload_type;
                    track.codec = codec.to_string();
                    track.sample_rate = sample_rate;
                }
                None => {}
            }
        });

        prune_by_payload_type(track, "fmtp", |track, value| {
            track.fmtp = value
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start()
                .to_string();
        });
    }

    if let Some(control) = track.attributes("control").last().map(str::to_string) {
        track.control = control;
    }

    if track.sample_rate == 0 {
        match track.track_type {
            TrackType::Video => track.sample_rate = 90000,
            TrackType::Audio => {
                if let Some(sample_rate) = resolver.sample_rate(track) {
                    track.sample_rate = sample_rate;
                }
            }
            _ => {}
        }
    }

    if track.track_type != TrackType::Title {
        tracing::debug!(
            track_type = %track.track_type,
            pt = track.payload_type,
            codec = %track.codec,
            sample_rate = track.sample_rate,
            channels = track.channels,
            "SDP track resolved"
        );
    }
}

/// Drop every `name` attribute whose leading payload type differs from the
/// track's, then hand each survivor to `apply` in order.
///
/// The track's payload type is re-read per entry because `apply` may set it.
fn prune_by_payload_type(
    track: &mut SdpTrack,
    name: &str,
    mut apply: impl FnMut(&mut SdpTrack, &str),
) {
    let mut i = 0;
    while i < track.attributes.len() {
        if track.attributes[i].0 != name {
            i += 1;
            continue;
        }
        let value = track.attributes[i].1.clone();
        let matches = leading_payload_type(&value) == Some(track.payload_type);
        if !matches && track.payload_type != PAYLOAD_TYPE_UNSET {
            tracing::trace!(
                attribute = name,
                value = %value,
                pt = track.payload_type,
                "payload type mismatch"
            );
            track.attributes.remove(i);
            continue;
        }
        apply(track, &value);
        i += 1;
    }
}

fn leading_payload_type(value: &str) -> Option<u8> {
    let digits = value.trim_start();
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

/// `<media> <port>[/<count>] <proto> <fmt> ...` of an `m=` line.
#[derive(Debug, PartialEq, Eq)]
struct MediaLine<'a> {
    media: &'a str,
    port: u16,
    port_count: Option<u16>,
    proto: &'a str,
    payload_type: u8,
}

impl<'a> MediaLine<'a> {
    /// Tries `<port>` first, then `<port>/<count>`. Only the first format
    /// number is kept.
    fn parse(value: &'a str) -> Option<Self> {
        let mut tokens = value.split_whitespace();
        let media = tokens.next()?;
        let port = tokens.next()?;
        let proto = tokens.next()?;
        let payload_type = tokens.next()?.parse().ok()?;

        let (port, port_count) = match port.parse() {
            Ok(port) => (port, None),
            Err(_) => {
                let (port, count) = port.split_once('/')?;
                (port.parse().ok()?, Some(count.parse().ok()?))
            }
        };
        Some(Self {
            media,
            port,
            port_count,
            proto,
            payload_type,
        })
    }
}

/// `<pt> <codec>/<rate>[/<channels>]` of an `a=rtpmap` value.
#[derive(Debug, PartialEq, Eq)]
struct Rtpmap<'a> {
    payload_type: u8,
    codec: &'a str,
    sample_rate: u32,
    channels: Option<u32>,
}

impl<'a> Rtpmap<'a> {
    fn parse(value: &'a str) -> Option<Self> {
        let (payload_type, encoding) = value.trim().split_once(char::is_whitespace)?;
        let payload_type = payload_type.parse().ok()?;
        let mut parts = encoding.trim_start().splitn(3, '/');
        let codec = parts.next().filter(|c| !c.is_empty())?;
        let sample_rate = parts.next()?.trim().parse().ok()?;
        let channels = match parts.next() {
            Some(channels) => Some(channels.trim().parse().ok()?),
            None => None,
        };
        Some(Self {
            payload_type,
            codec,
            sample_rate,
            channels,
        })
    }
}

/// `<unit>=<start>-[<end>]` of an `a=range` value, in seconds.
///
/// A start of `now` counts as 0 and a missing end as 0, so live ranges end
/// up with a duration of 0 or less.
fn parse_range(value: &str) -> Option<(f32, f32)> {
    let (unit, times) = value.split_once('=')?;
    if unit.trim().is_empty() {
        return None;
    }
    let (start, end) = times.split_once('-').unwrap_or((times, ""));
    let start = match start.trim() {
        "" => return None,
        "now" => 0.0,
        start => npt_seconds(start)?,
    };
    let end = match end.split_whitespace().next() {
        None => 0.0,
        Some(end) => npt_seconds(end)?,
    };
    Some((start, end))
}

/// Seconds of an npt time, either `<secs>[.frac]` or `<h>:<mm>:<ss>[.frac]`.
fn npt_seconds(value: &str) -> Option<f32> {
    if !value.contains(':') {
        return value.parse().ok();
    }
    let mut parts = value.rsplitn(3, ':');
    let seconds: f32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    let hours: u32 = parts.next().map_or(Some(0), |h| h.parse().ok())?;
    let whole = hours.checked_mul(3600)?.checked_add(minutes.checked_mul(60)?)?;
    Some(whole as f32 + seconds)
}
