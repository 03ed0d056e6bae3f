//! Frame dispatch: pure functions over byte slices plus the mutable ARP
//! cache / TCP endpoint table. No TAP I/O happens here, which is what lets
//! this module be unit-tested without a real network interface.

use crate::arp::{ArpHeader, ArpIpv4Body, ArpMessage, ArpResponder};
use crate::checksum::Checksum;
use crate::ether_type::EtherType;
use crate::ethernet::EthernetHeader;
use crate::icmp::{self, IcmpEchoBody, IcmpHeader, IcmpType};
use crate::ip_protocol::IPProtocol;
use crate::ipv4::IPv4Header;
use crate::tcp::{TcpEndpointTable, TcpHeader, TcpPseudoHeader};
use crate::wire::{WireHeader, WireReader, WireWriter};
use tracing::{debug, trace, warn};

/// Why a frame produced no response. Every variant is a deliberate,
/// non-fatal drop — the dispatcher never panics on untrusted input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Fewer bytes than an Ethernet header.
    #[error("short frame: {0} bytes")]
    ShortFrame(usize),
    /// EtherType other than ARP or IPv4.
    #[error("unhandled ethertype {0:#06x}")]
    UnhandledEtherType(u16),
    /// IP protocol other than ICMP or TCP.
    #[error("unhandled ip protocol {0}")]
    UnhandledIpProtocol(u8),
    /// IPv4 header carries options (IHL != 5), which this stack does not
    /// parse.
    #[error("ipv4 options not supported (ihl={0})")]
    Ipv4OptionsUnsupported(u8),
    /// ARP hw/proto type combination other than (Ethernet, IPv4).
    #[error("unsupported arp hw/proto type combination")]
    UnsupportedArpAddressFamily,
    /// ICMP type other than EchoRequest.
    #[error("non-echo icmp type {0}")]
    NonEchoIcmp(u8),
    /// TCP checksum did not match the received payload.
    #[error("tcp checksum mismatch")]
    TcpChecksumMismatch,
    /// A header or options span ran past the end of the buffer.
    #[error("wire error: {0}")]
    Wire(#[from] crate::wire::WireError),
    /// A TCP option failed to parse.
    #[error("tcp option error: {0}")]
    TcpOption(#[from] crate::tcp::TcpOptionError),
}

/// Mutable state the dispatcher threads across frames: the ARP cache
/// (inside [`ArpResponder`]) and the TCP endpoint table.
pub struct DispatchState {
    /// Answers ARP requests for our own `(ip, mac)`.
    pub arp: ArpResponder,
    /// Per-local-port TCP handshake/ACK state.
    pub tcp: TcpEndpointTable,
}

impl DispatchState {
    /// Creates dispatcher state bound to the stack's own IPv4/MAC.
    pub fn new(ip: [u8; 4], mac: [u8; 6]) -> Self {
        Self {
            arp: ArpResponder::new(ip, mac),
            tcp: TcpEndpointTable::new(),
        }
    }
}

/// The dispatcher's per-frame result: what was parsed, what (if anything)
/// was emitted, or why the frame was dropped. Feeds both `tracing` logging
/// and the diagnostic renderer.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// A response frame was produced and should be written back.
    Replied {
        /// EtherType of the incoming frame.
        ether_type: EtherType,
        /// The assembled response frame, ready to write to the TAP device.
        response: Vec<u8>,
    },
    /// The frame was valid but produced no response (e.g. gratuitous ARP
    /// learning, a duplicate ACK).
    Consumed {
        /// EtherType of the incoming frame.
        ether_type: EtherType,
    },
    /// The frame was dropped for the stated reason.
    Dropped {
        /// Why the frame was dropped.
        reason: DispatchError,
    },
}

/// Dispatches one frame, logging the outcome via `tracing` and returning a
/// [`DispatchOutcome`] for the diagnostic renderer. This is the entry point
/// the binary's read loop calls; [`dispatch_frame`] is the pure core it
/// wraps.
pub fn dispatch(frame: &[u8], state: &mut DispatchState) -> DispatchOutcome {
    let ether_type = frame
        .get(12..14)
        .map(|b| EtherType::new(u16::from_be_bytes([b[0], b[1]])))
        .unwrap_or(EtherType::new(0));

    match dispatch_frame(frame, state) {
        Ok(Some(response)) => {
            debug!(?ether_type, bytes = response.len(), "dispatched frame, emitting response");
            DispatchOutcome::Replied { ether_type, response }
        }
        Ok(None) => {
            trace!(?ether_type, "dispatched frame, no response");
            DispatchOutcome::Consumed { ether_type }
        }
        Err(reason) => {
            warn!(%reason, ?ether_type, "dropped frame");
            DispatchOutcome::Dropped { reason }
        }
    }
}

fn reversed_ethernet(incoming: &EthernetHeader, ether_type: EtherType) -> EthernetHeader {
    EthernetHeader {
        destination: incoming.source,
        source: incoming.destination,
        ether_type,
    }
}

/// Processes one Ethernet frame (virtio-net header, if any, already
/// stripped by the caller). Returns the bytes of a response frame to
/// transmit, or `Err` naming why nothing was produced.
pub fn dispatch_frame(frame: &[u8], state: &mut DispatchState) -> Result<Option<Vec<u8>>, DispatchError> {
    if frame.len() < EthernetHeader::WIRE_SIZE {
        return Err(DispatchError::ShortFrame(frame.len()));
    }

    let mut reader = WireReader::new(frame);
    let ethernet = EthernetHeader::parse(&mut reader)?;

    match ethernet.ether_type {
        EtherType::ARP => dispatch_arp(&ethernet, &mut reader, state),
        EtherType::IPV4 => dispatch_ipv4(&ethernet, &mut reader, state),
        other => Err(DispatchError::UnhandledEtherType(other.ether_type())),
    }
}

fn dispatch_arp(
    ethernet: &EthernetHeader,
    reader: &mut WireReader<'_>,
    state: &mut DispatchState,
) -> Result<Option<Vec<u8>>, DispatchError> {
    let header = ArpHeader::parse(reader)?;
    if header.proto_type != EtherType::IPV4 {
        return Err(DispatchError::UnsupportedArpAddressFamily);
    }
    let body = ArpIpv4Body::parse(reader)?;

    let message = ArpMessage { header, body };
    let Some(reply) = state.arp.on_message(&message) else {
        return Ok(None);
    };

    let mut writer = WireWriter::with_capacity(
        EthernetHeader::WIRE_SIZE + ArpHeader::WIRE_SIZE + ArpIpv4Body::WIRE_SIZE,
    );
    reversed_ethernet(ethernet, EtherType::ARP).write(&mut writer);
    reply.header.write(&mut writer);
    reply.body.write(&mut writer);
    Ok(Some(writer.into_vec()))
}

fn dispatch_ipv4(
    ethernet: &EthernetHeader,
    reader: &mut WireReader<'_>,
    state: &mut DispatchState,
) -> Result<Option<Vec<u8>>, DispatchError> {
    let ipv4_start = reader.position();
    let ipv4 = IPv4Header::parse(reader)?;
    // `total_length` already counts the IPv4 header itself, so the payload
    // boundary is simply the header's start offset plus that length.
    let packet_end_offset = ipv4_start + usize::from(ipv4.total_length);

    if ipv4.ihl() != 5 {
        return Err(DispatchError::Ipv4OptionsUnsupported(ipv4.ihl()));
    }

    match ipv4.protocol {
        IPProtocol::ICMP => dispatch_icmp(ethernet, &ipv4, reader, packet_end_offset),
        IPProtocol::TCP => dispatch_tcp(ethernet, &ipv4, reader, packet_end_offset, state),
        other => Err(DispatchError::UnhandledIpProtocol(other.protocol())),
    }
}

fn dispatch_icmp(
    ethernet: &EthernetHeader,
    ipv4: &IPv4Header,
    reader: &mut WireReader<'_>,
    packet_end_offset: usize,
) -> Result<Option<Vec<u8>>, DispatchError> {
    let header = IcmpHeader::parse(reader)?;
    if header.icmp_type != IcmpType::ECHO_REQUEST {
        return Err(DispatchError::NonEchoIcmp(header.icmp_type.icmp_type()));
    }
    let echo = IcmpEchoBody::parse(reader)?;
    let payload_start = reader.position();
    let payload = reader
        .slice(packet_end_offset.saturating_sub(payload_start))
        .map_err(DispatchError::from)?;

    let Some((reply_header, reply_echo, reply_payload)) = icmp::echo_reply(&header, &echo, payload)
    else {
        return Ok(None);
    };

    let mut reply_ipv4 = *ipv4;
    std::mem::swap(&mut reply_ipv4.src_ip, &mut reply_ipv4.dst_ip);
    reply_ipv4.checksum = 0;
    reply_ipv4.checksum = reply_ipv4.compute_checksum();

    let mut writer = WireWriter::with_capacity(
        EthernetHeader::WIRE_SIZE
            + IPv4Header::WIRE_SIZE
            + IcmpHeader::WIRE_SIZE
            + IcmpEchoBody::WIRE_SIZE
            + reply_payload.len(),
    );
    reversed_ethernet(ethernet, EtherType::IPV4).write(&mut writer);
    reply_ipv4.write(&mut writer);
    reply_header.write(&mut writer);
    reply_echo.write(&mut writer);
    writer.bytes(&reply_payload);
    Ok(Some(writer.into_vec()))
}

fn dispatch_tcp(
    ethernet: &EthernetHeader,
    ipv4: &IPv4Header,
    reader: &mut WireReader<'_>,
    packet_end_offset: usize,
    state: &mut DispatchState,
) -> Result<Option<Vec<u8>>, DispatchError> {
    let tcp_header_start = reader.position();
    let header = TcpHeader::parse(reader)?;
    let options_end = tcp_header_start + header.header_len();
    let options = crate::tcp::parse_options(reader, options_end)?;

    let payload = reader
        .slice(packet_end_offset.saturating_sub(reader.position()))
        .map_err(DispatchError::from)?;

    let tcp_length = (header.header_len() + payload.len()) as u16;
    let pseudo = TcpPseudoHeader::new(ipv4.src_ip, ipv4.dst_ip, tcp_length);

    // The header's `checksum` field is included verbatim (not zeroed) here:
    // verifying a received segment sums it as received, which folds to zero
    // exactly when the sender's checksum matches.
    let received_span = reconstruct_tcp_span(&header, &options, payload);
    let mut checksum = Checksum::new();
    let mut pseudo_writer = WireWriter::with_capacity(TcpPseudoHeader::WIRE_SIZE);
    pseudo.write(&mut pseudo_writer);
    checksum.add(&pseudo_writer.into_vec());
    checksum.add(&received_span);
    if checksum.finalize() != 0 {
        return Err(DispatchError::TcpChecksumMismatch);
    }

    let Some(response) = state.tcp.on_message(&header, payload.len()) else {
        return Ok(None);
    };

    let mut reply_ipv4 = *ipv4;
    std::mem::swap(&mut reply_ipv4.src_ip, &mut reply_ipv4.dst_ip);
    reply_ipv4.total_length = (IPv4Header::WIRE_SIZE + TcpHeader::WIRE_SIZE) as u16;
    reply_ipv4.checksum = 0;
    reply_ipv4.checksum = reply_ipv4.compute_checksum();

    let reply_pseudo = TcpPseudoHeader::new(
        reply_ipv4.src_ip,
        reply_ipv4.dst_ip,
        TcpHeader::WIRE_SIZE as u16,
    );
    let mut reply_checksum = Checksum::new();
    let mut pseudo_writer = WireWriter::with_capacity(TcpPseudoHeader::WIRE_SIZE);
    reply_pseudo.write(&mut pseudo_writer);
    reply_checksum.add(&pseudo_writer.into_vec());
    let mut header_writer = WireWriter::with_capacity(TcpHeader::WIRE_SIZE);
    response.write(&mut header_writer);
    reply_checksum.add(&header_writer.into_vec());

    let mut final_response = response;
    final_response.checksum = reply_checksum.finalize();

    let mut writer = WireWriter::with_capacity(
        EthernetHeader::WIRE_SIZE + IPv4Header::WIRE_SIZE + TcpHeader::WIRE_SIZE,
    );
    reversed_ethernet(ethernet, EtherType::IPV4).write(&mut writer);
    reply_ipv4.write(&mut writer);
    final_response.write(&mut writer);
    Ok(Some(writer.into_vec()))
}

/// Re-serializes the TCP header+options+payload span exactly as received,
/// for checksum verification.
fn reconstruct_tcp_span(header: &TcpHeader, options: &[crate::tcp::TcpOption], payload: &[u8]) -> Vec<u8> {
    let mut writer = WireWriter::with_capacity(header.header_len() + payload.len());
    header.write(&mut writer);
    for option in options {
        option
            .write(&mut writer)
            .expect("every parsed option variant re-encodes");
    }
    writer.bytes(payload);
    writer.into_vec()
}
