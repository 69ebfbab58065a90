use std::collections::HashMap;
use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rtsp_media::config::PORT_RANGE_KEY;
use rtsp_media::media::rtp;
use rtsp_media::transport::StdSocketFactory;
use rtsp_media::{PortRange, Protocol, RtpPacket, SdpParser, SocketPairAllocator};

#[derive(Parser)]
#[command(
    name = "rtsp-probe",
    about = "Inspect SDP offers, RTP packets and RTP port pools"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse an SDP file ("-" for stdin) and print its tracks
    Sdp { file: String },

    /// Classify and decode a hex-encoded packet, bare or '$'-interleaved
    Rtp { hex: String },

    /// Bind RTP/RTCP socket pairs on 127.0.0.1
    Ports {
        /// Port range (min-max)
        #[arg(long, short, default_value = "30000-35000")]
        range: PortRange,

        /// Number of pairs to bind
        #[arg(long, short, default_value_t = 4)]
        count: usize,

        /// Bind TCP listeners instead of UDP sockets
        #[arg(long)]
        tcp: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let result = match args.command {
        Command::Sdp { file } => inspect_sdp(&file),
        Command::Rtp { hex } => decode_rtp(&hex),
        Command::Ports { range, count, tcp } => draw_ports(range, count, tcp),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rtsp-probe: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn inspect_sdp(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    let text = if file == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(file)?
    };
    tracing::debug!(file, bytes = text.len(), "read SDP");

    let sdp = SdpParser::parse(&text);
    if !sdp.available() {
        return Err("no audio or video track".into());
    }

    for track in sdp.available_tracks() {
        println!(
            "{:<6} pt={:<3} codec={} rate={} channels={} control={}",
            track.track_type.as_str(),
            track.payload_type,
            track.codec,
            track.sample_rate,
            track.channels,
            track.control
        );
    }
    println!();
    print!("{}", sdp);
    Ok(())
}

fn decode_rtp(hex: &str) -> Result<(), Box<dyn std::error::Error>> {
    let raw = hex::decode(hex.trim())?;
    let packet = if raw.first() == Some(&b'$') {
        RtpPacket::from_interleaved(raw)?
    } else if rtp::is_rtcp(&raw) {
        println!("RTCP packet type {}", raw[1]);
        if let Some(ssrc) = rtp::get_ssrc(&raw) {
            println!("word at offset 8: {}", rtp::format_ssrc(ssrc));
        }
        return Ok(());
    } else if rtp::is_rtp(&raw) {
        RtpPacket::from_datagram(raw)?
    } else {
        return Err("neither RTP nor RTCP".into());
    };

    if let Some(channel) = packet.interleaved_channel() {
        println!("interleaved channel: {}", channel);
    }
    println!("ssrc: {}", rtp::format_ssrc(packet.ssrc()));
    print!("{}", packet.header());
    if packet.payload_size() < 0 {
        println!("malformed: padding and extension exceed packet size");
    }
    Ok(())
}

fn draw_ports(range: PortRange, count: usize, tcp: bool) -> Result<(), Box<dyn std::error::Error>> {
    let protocol = if tcp { Protocol::Tcp } else { Protocol::Udp };
    let config = HashMap::from([(PORT_RANGE_KEY.to_string(), range.to_string())]);
    let allocator = SocketPairAllocator::from_config(&config, StdSocketFactory)?;
    let local_ip = IpAddr::V4(Ipv4Addr::LOCALHOST);

    let mut held = Vec::with_capacity(count);
    for _ in 0..count {
        let pair = allocator.make_sock_pair(local_ip, true, protocol)?;
        println!(
            "{} rtp={} rtcp={}",
            pair.protocol(),
            pair.rtp_port(),
            pair.rtcp_port()
        );
        held.push(pair);
    }
    println!(
        "{} of {} pairs free",
        allocator.pools().pool(protocol).available(),
        allocator.pools().pool(protocol).capacity()
    );
    Ok(())
}
