//! Integration tests: SDP offers feeding RTP framing, and socket pairs
//! allocated from a shared port pool.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rtsp_media::config::PORT_RANGE_KEY;
use rtsp_media::media::rtp::{self, RtpHeaderWriter};
use rtsp_media::media::{CodecId, TrackInfo};
use rtsp_media::protocol::sdp::{DefaultSdp, Sdp, TitleSdp};
use rtsp_media::transport::StdSocketFactory;
use rtsp_media::{
    PortPairPool, PortRange, Protocol, RtpPacket, RtspError, SdpParser, SocketPairAllocator,
    TrackType,
};

const CAMERA_OFFER: &str = "v=0\r\n\
o=- 1 1 IN IP4 192.168.1.64\r\n\
s=Media Presentation\r\n\
t=0 0\r\n\
a=control:rtsp://192.168.1.64/Streaming/Channels/101\r\n\
a=range:npt=now-\r\n\
m=video 0 RTP/AVP 96\r\n\
b=AS:4096\r\n\
a=rtpmap:96 H264/90000\r\n\
a=fmtp:96 profile-level-id=420029; packetization-mode=1\r\n\
a=control:trackID=1\r\n\
m=audio 0 RTP/AVP 97\r\n\
a=rtpmap:97 MPEG4-GENERIC/0/2\r\n\
a=fmtp:97 streamtype=5;profile-level-id=1;mode=AAC-hbr;sizelength=13;indexlength=3;indexdeltalength=3;config=1190\r\n\
a=control:trackID=2\r\n";

#[test]
fn camera_offer_drives_rtp_framing() {
    let sdp = SdpParser::parse(CAMERA_OFFER);
    assert!(sdp.available());

    let base = sdp.control_url("rtsp://192.168.1.64/live");
    assert_eq!(base, "rtsp://192.168.1.64/Streaming/Channels/101");
    assert!(sdp.track(TrackType::Title).unwrap().is_live());

    let video = sdp.track(TrackType::Video).expect("video track");
    assert_eq!(video.codec, "H264");
    assert_eq!(video.fmtp, "profile-level-id=420029; packetization-mode=1");
    assert_eq!(
        video.control_url(&base),
        "rtsp://192.168.1.64/Streaming/Channels/101/trackID=1"
    );

    let audio = sdp.track(TrackType::Audio).expect("audio track");
    assert_eq!(CodecId::from_name(&audio.codec), CodecId::Aac);
    assert_eq!(audio.sample_rate, 48000);
    assert_eq!(audio.channels, 2);

    // Packets written for the negotiated video track parse back with its clock.
    let mut writer = RtpHeaderWriter::new(video.payload_type, 0x1234_5678);
    writer.advance_timestamp(video.sample_rate * 2);
    let packet = writer
        .packet(true, &[0x65, 0x88, 0x80])
        .with_sample_rate(video.sample_rate);
    assert_eq!(packet.header().payload_type(), 96);
    assert!(packet.header().marker());
    assert_eq!(packet.stamp_ms(), 2000);

    let framed = packet.interleave(0).expect("interleave");
    let raw = framed.as_bytes().to_vec();
    assert_eq!(raw[0], b'$');
    assert!(rtp::is_rtp(&raw[4..]));
    assert_eq!(rtp::get_ssrc(&raw[4..]), Some(0x1234_5678));

    let parsed = RtpPacket::from_interleaved(raw).expect("parse interleaved");
    assert_eq!(parsed.interleaved_channel(), Some(0));
    assert_eq!(parsed.payload(), Some(&[0x65u8, 0x88, 0x80][..]));
}

#[test]
fn generated_description_parses_back() {
    let video = TrackInfo::video(CodecId::H265).with_bit_rate(1024 * 1024);
    let audio = TrackInfo::audio(CodecId::G711A, 8000, 1);

    let mut text = TitleSdp::new(30.0).sdp().to_string();
    text.push_str(DefaultSdp::new(96, &video).sdp());
    text.push_str(DefaultSdp::new(8, &audio).sdp());

    let sdp = SdpParser::parse(&text);
    let title = sdp.track(TrackType::Title).unwrap();
    assert_eq!(title.duration, 30.0);
    assert!(!title.is_live());

    let video = sdp.track(TrackType::Video).unwrap();
    assert_eq!(video.payload_type, 96);
    assert_eq!(video.codec, "H265");
    assert_eq!(video.sample_rate, 90000);
    assert_eq!(video.bandwidth, "AS:1024");

    let audio = sdp.track(TrackType::Audio).unwrap();
    assert_eq!(audio.payload_type, 8);
    assert_eq!(audio.name(), "PCMA");
    assert_eq!(audio.sample_rate, 8000);
    assert_eq!(audio.channels, 1);

    assert_eq!(sdp.available_tracks().len(), 2);
}

#[test]
fn concurrent_acquire_never_shares_a_pair() {
    let pool = PortPairPool::new(
        Protocol::Udp,
        PortRange {
            min: 30000,
            max: 32000,
        },
    )
    .unwrap();
    let capacity = pool.capacity();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                let mut held = Vec::new();
                for _ in 0..200 {
                    if let Some(pair) = pool.acquire() {
                        held.push(pair);
                    }
                    if held.len() > 50 {
                        held.truncate(25);
                    }
                }
                held
            })
        })
        .collect();

    let held: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("worker panicked"))
        .collect();
    let indices: HashSet<u16> = held.iter().map(|p| p.index()).collect();
    assert_eq!(indices.len(), held.len());
    assert_eq!(pool.available() + held.len(), capacity);

    drop(held);
    assert_eq!(pool.available(), capacity);
}

#[test]
fn loopback_socket_pair_receives_rtp() {
    let mut config = HashMap::new();
    config.insert(PORT_RANGE_KEY.to_string(), "46000-46999".to_string());
    let allocator = SocketPairAllocator::from_config(&config, StdSocketFactory).unwrap();

    let local_ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
    let pair = allocator
        .make_sock_pair(local_ip, true, Protocol::Udp)
        .expect("socket pair");
    assert_eq!(pair.rtp.local_addr().unwrap().port(), pair.rtp_port());
    assert_eq!(pair.rtcp.local_addr().unwrap().port(), pair.rtp_port() + 1);

    let (tcp_rtp, tcp_rtcp) = pair.reserved();
    assert_eq!(tcp_rtp.protocol(), Protocol::Tcp);
    assert_eq!(tcp_rtp.local_addr().unwrap().port(), pair.rtp_port());
    assert_eq!(tcp_rtcp.local_addr().unwrap().port(), pair.rtcp_port());

    let receiver = pair.rtp.as_udp().expect("udp socket");
    receiver
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();

    let packet = RtpHeaderWriter::new(96, 42).packet(false, b"hello");
    let sender = UdpSocket::bind((local_ip, 0)).unwrap();
    sender
        .send_to(packet.as_bytes(), (local_ip, pair.rtp_port()))
        .unwrap();

    let mut buf = [0u8; 1500];
    let (len, _) = receiver.recv_from(&mut buf).expect("receive rtp");
    assert!(rtp::is_rtp(&buf[..len]));
    let received = RtpPacket::from_datagram(buf[..len].to_vec()).unwrap();
    assert_eq!(received.ssrc(), 42);
    assert_eq!(received.payload(), Some(&b"hello"[..]));

    let lease = Arc::clone(pair.port_pair());
    let available = allocator.pools().udp.available();
    drop(pair);
    drop(lease);
    assert_eq!(allocator.pools().udp.available(), available + 1);
}

#[test]
fn narrow_configured_range_is_rejected() {
    let mut config = HashMap::new();
    config.insert(PORT_RANGE_KEY.to_string(), "50000-50010".to_string());
    let err = SocketPairAllocator::from_config(&config, StdSocketFactory).unwrap_err();
    assert!(matches!(err, RtspError::PortRangeTooNarrow { .. }));
}
