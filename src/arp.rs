//! Address Resolution Protocol: IPv4-address-to-MAC-address lookup over
//! Ethernet. <https://www.rfc-editor.org/rfc/rfc826>

use std::collections::HashMap;

use crate::ether_type::EtherType;
use crate::struct_variants;
use crate::wire::{assert_layout, WireError, WireHeader, WireReader, WireWriter};

struct_variants! {
  ArpHwType, hw_type, u16:
    /// Ethernet (10Mb)
    ETHERNET => 0x0001,
}

struct_variants! {
  ArpOpcode, opcode, u16:
    /// Request "who has this protocol address"
    REQUEST => 0x0001,
    /// Reply "here is the hardware address"
    REPLY   => 0x0002,
}

/// The fixed 8-byte ARP header preceding the hardware/protocol addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArpHeader {
    /// Hardware address space, e.g. Ethernet.
    pub hw_type: ArpHwType,
    /// Protocol address space; reuses [`EtherType`] values (e.g. IPv4).
    pub proto_type: EtherType,
    /// Length in bytes of a hardware address.
    pub hw_size: u8,
    /// Length in bytes of a protocol address.
    pub proto_size: u8,
    /// Request or reply.
    pub opcode: ArpOpcode,
}

impl WireHeader for ArpHeader {
    const FIELD_WIDTHS: &'static [usize] = &[2, 2, 1, 1, 2];
    const WIRE_SIZE: usize = 8;
    const NAME: &'static str = "ArpHeader";
}

const _: () = assert_layout::<ArpHeader>();

impl ArpHeader {
    /// Parses an 8-byte ARP header.
    pub fn parse(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let hw_type = ArpHwType::new(reader.u16()?);
        let proto_type = EtherType::new(reader.u16()?);
        let hw_size = reader.u8()?;
        let proto_size = reader.u8()?;
        let opcode = ArpOpcode::new(reader.u16()?);
        Ok(Self {
            hw_type,
            proto_type,
            hw_size,
            proto_size,
            opcode,
        })
    }

    /// Serializes this header onto `writer`.
    pub fn write(&self, writer: &mut WireWriter) {
        writer
            .u16(self.hw_type.hw_type())
            .u16(self.proto_type.ether_type())
            .u8(self.hw_size)
            .u8(self.proto_size)
            .u16(self.opcode.opcode());
    }
}

/// The 20-byte IPv4-over-Ethernet ARP body: source/destination hardware and
/// protocol addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArpIpv4Body {
    /// Sender hardware (MAC) address.
    pub src_mac: [u8; 6],
    /// Sender protocol (IPv4) address.
    pub src_ip: [u8; 4],
    /// Target hardware (MAC) address.
    pub dst_mac: [u8; 6],
    /// Target protocol (IPv4) address.
    pub dst_ip: [u8; 4],
}

impl WireHeader for ArpIpv4Body {
    const FIELD_WIDTHS: &'static [usize] = &[6, 4, 6, 4];
    const WIRE_SIZE: usize = 20;
    const NAME: &'static str = "ArpIpv4Body";
}

const _: () = assert_layout::<ArpIpv4Body>();

impl ArpIpv4Body {
    /// Parses the 20-byte IPv4-over-Ethernet ARP body.
    pub fn parse(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let src_mac = reader.bytes6()?;
        let src_ip = reader.bytes4()?;
        let dst_mac = reader.bytes6()?;
        let dst_ip = reader.bytes4()?;
        Ok(Self {
            src_mac,
            src_ip,
            dst_mac,
            dst_ip,
        })
    }

    /// Serializes this body onto `writer`.
    pub fn write(&self, writer: &mut WireWriter) {
        writer
            .bytes(&self.src_mac)
            .bytes(&self.src_ip)
            .bytes(&self.dst_mac)
            .bytes(&self.dst_ip);
    }
}

/// A complete inbound/outbound ARP message: header plus IPv4 body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArpMessage {
    /// The fixed ARP header.
    pub header: ArpHeader,
    /// The IPv4-over-Ethernet address body.
    pub body: ArpIpv4Body,
}

/// `(protocol_type, protocol_address) -> hardware_address`, upserted on
/// every sighting and never evicted for the lifetime of the process.
#[derive(Debug, Default)]
pub struct ArpCache {
    table: HashMap<(EtherType, [u8; 4]), [u8; 6]>,
}

impl ArpCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a previously-learned hardware address.
    pub fn lookup(&self, proto_type: EtherType, proto_addr: [u8; 4]) -> Option<[u8; 6]> {
        self.table.get(&(proto_type, proto_addr)).copied()
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True if nothing has been learned yet.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Answers ARP requests addressed to a fixed local `(ip, mac)` pair,
/// learning every sender it sees along the way.
#[derive(Debug)]
pub struct ArpResponder {
    ip: [u8; 4],
    mac: [u8; 6],
    cache: ArpCache,
}

impl ArpResponder {
    /// Creates a responder bound to `ip`/`mac`, with an empty cache.
    pub fn new(ip: [u8; 4], mac: [u8; 6]) -> Self {
        Self {
            ip,
            mac,
            cache: ArpCache::new(),
        }
    }

    /// The cache accumulated so far, for diagnostics.
    pub fn cache(&self) -> &ArpCache {
        &self.cache
    }

    /// Processes one inbound ARP message. Only `hw_type = Ethernet` and
    /// `proto_type = IPv4` are accepted; anything else is dropped silently
    /// (not even learned), matching the rest of the dispatcher's handling of
    /// unrecognised combinations.
    pub fn on_message(&mut self, message: &ArpMessage) -> Option<ArpMessage> {
        if message.header.hw_type != ArpHwType::ETHERNET || message.header.proto_type != EtherType::IPV4 {
            return None;
        }

        self.cache
            .table
            .insert((message.header.proto_type, message.body.src_ip), message.body.src_mac);

        if message.header.opcode != ArpOpcode::REQUEST || message.body.dst_ip != self.ip {
            return None;
        }

        let mut header = message.header;
        header.opcode = ArpOpcode::REPLY;

        let mut body = message.body;
        body.dst_mac = body.src_mac;
        body.src_mac = self.mac;
        std::mem::swap(&mut body.src_ip, &mut body.dst_ip);

        Some(ArpMessage { header, body })
    }
}
