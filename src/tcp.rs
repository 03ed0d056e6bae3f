//! TCP: header, options, pseudo-header checksum input, and the
//! per-destination-port endpoint table that drives handshake/ACK replies.
//! <https://en.wikipedia.org/wiki/Transmission_Control_Protocol>

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

use crate::ip_protocol::IPProtocol;
use crate::wire::{assert_layout, WireError, WireHeader, WireReader, WireWriter};

/// The 8-bit flags field: bit0 FIN .. bit7 CWR.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags {
    raw: u8,
}

macro_rules! tcp_flags {
  ($($name:ident => $pos:expr,)*) => {
    impl TcpFlags {
      $(paste::paste! {
        /// Returns true if this bit is set.
        pub const fn [<get_ $name>](&self) -> bool {
          self.raw & (1 << $pos) != 0
        }

        /// Sets this bit to `state`.
        pub fn [<set_ $name>](&mut self, state: bool) -> bool {
          if state {
            self.raw |= 1 << $pos;
          } else {
            self.raw &= !(1 << $pos);
          }
          state
        }
      })*
    }

    paste::paste! {
      impl Debug for TcpFlags {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
          f.debug_struct("TcpFlags")
            $(.field(stringify!($name), &self.[<get_ $name>]()))*
            .finish()
        }
      }
    }
  };
}

tcp_flags! {
  fin => 0u8,
  syn => 1u8,
  rst => 2u8,
  psh => 3u8,
  ack => 4u8,
  urg => 5u8,
  ece => 6u8,
  cwr => 7u8,
}

impl TcpFlags {
    /// The flags byte as raw bits, no accessor semantics applied.
    pub const fn raw(&self) -> u8 {
        self.raw
    }
}

impl From<u8> for TcpFlags {
    fn from(raw: u8) -> Self {
        Self { raw }
    }
}

impl From<TcpFlags> for u8 {
    fn from(flags: TcpFlags) -> Self {
        flags.raw
    }
}

/// A parsed 20-byte TCP header (options excluded; see [`TcpOption`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TcpHeader {
    /// Sending port.
    pub source_port: u16,
    /// Receiving port.
    pub dest_port: u16,
    /// Sequence number (meaning depends on the SYN flag).
    pub sequence_no: u32,
    /// Acknowledgment number, valid when the ACK flag is set.
    pub ack_no: u32,
    /// High nibble: data offset in 32-bit words. Low nibble: reserved, must
    /// be zero on emit.
    pub data_offset_reserved: u8,
    /// Control bits.
    pub flags: TcpFlags,
    /// Receive window size.
    pub window: u16,
    /// Checksum over pseudo-header + header + options + payload.
    pub checksum: u16,
    /// Offset from `sequence_no` of the last urgent byte, valid when URG is
    /// set.
    pub urgent_pointer: u16,
}

impl WireHeader for TcpHeader {
    const FIELD_WIDTHS: &'static [usize] = &[2, 2, 4, 4, 1, 1, 2, 2, 2];
    const WIRE_SIZE: usize = 20;
    const NAME: &'static str = "TcpHeader";
}

const _: () = assert_layout::<TcpHeader>();

impl TcpHeader {
    /// Data offset in 32-bit words (high nibble of `data_offset_reserved`).
    pub fn data_offset(&self) -> u8 {
        self.data_offset_reserved >> 4
    }

    /// Header length in bytes (`data_offset() * 4`).
    pub fn header_len(&self) -> usize {
        usize::from(self.data_offset()) * 4
    }

    /// Packs a data offset (4 bits) with a zero reserved nibble.
    pub fn pack_data_offset(data_offset: u8) -> u8 {
        data_offset << 4
    }

    /// Parses a 20-byte TCP header.
    pub fn parse(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let source_port = reader.u16()?;
        let dest_port = reader.u16()?;
        let sequence_no = reader.u32()?;
        let ack_no = reader.u32()?;
        let data_offset_reserved = reader.u8()?;
        let flags = TcpFlags::from(reader.u8()?);
        let window = reader.u16()?;
        let checksum = reader.u16()?;
        let urgent_pointer = reader.u16()?;
        Ok(Self {
            source_port,
            dest_port,
            sequence_no,
            ack_no,
            data_offset_reserved,
            flags,
            window,
            checksum,
            urgent_pointer,
        })
    }

    /// Serializes this header onto `writer`.
    pub fn write(&self, writer: &mut WireWriter) {
        writer
            .u16(self.source_port)
            .u16(self.dest_port)
            .u32(self.sequence_no)
            .u32(self.ack_no)
            .u8(self.data_offset_reserved)
            .u8(self.flags.raw())
            .u16(self.window)
            .u16(self.checksum)
            .u16(self.urgent_pointer);
    }
}

/// The 12-byte pseudo-header fed into the TCP checksum; never transmitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TcpPseudoHeader {
    /// Source IPv4 address.
    pub src_ip: [u8; 4],
    /// Destination IPv4 address.
    pub dst_ip: [u8; 4],
    /// Always zero.
    pub zero: u8,
    /// Always [`IPProtocol::TCP`].
    pub protocol: IPProtocol,
    /// `data_offset() * 4 + payload.len()`: the TCP header plus options plus
    /// payload, excluding the pseudo-header itself.
    pub tcp_length: u16,
}

impl WireHeader for TcpPseudoHeader {
    const FIELD_WIDTHS: &'static [usize] = &[4, 4, 1, 1, 2];
    const WIRE_SIZE: usize = 12;
    const NAME: &'static str = "TcpPseudoHeader";
}

const _: () = assert_layout::<TcpPseudoHeader>();

impl TcpPseudoHeader {
    /// Builds the pseudo-header for a TCP segment of `tcp_length` bytes
    /// (header + options + payload) between `src_ip` and `dst_ip`.
    pub fn new(src_ip: [u8; 4], dst_ip: [u8; 4], tcp_length: u16) -> Self {
        Self {
            src_ip,
            dst_ip,
            zero: 0,
            protocol: IPProtocol::TCP,
            tcp_length,
        }
    }

    /// Serializes this pseudo-header onto `writer`.
    pub fn write(&self, writer: &mut WireWriter) {
        writer
            .bytes(&self.src_ip)
            .bytes(&self.dst_ip)
            .u8(self.zero)
            .u8(self.protocol.protocol())
            .u16(self.tcp_length);
    }
}

/// A single parsed TCP option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TcpOption {
    /// Type 0: marks the end of the options list.
    EndOfOptions,
    /// Type 1: single-byte padding/alignment option.
    NoOp,
    /// Type 2, size 4: maximum segment size.
    Mss(u16),
    /// Type 3, size 3: window scale shift count.
    WindowScale(u8),
    /// Type 4, size 2: selective-ack permitted.
    SAckPermitted,
    /// Type 8, size 10: (timestamp value, echo reply).
    Timestamps(u32, u32),
}

/// Failure while parsing a TCP options span.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TcpOptionError {
    /// Ran out of bytes mid-option.
    #[error("short options span: {0}")]
    Short(#[from] WireError),
    /// Option type outside the supported set (best-effort parse only
    /// handles the six types the dispatcher needs).
    #[error("unsupported TCP option type {0}")]
    Unsupported(u8),
    /// An option's fixed size ran past the data-offset boundary, landing the
    /// cursor somewhere other than exactly `end_offset`. Mirrors
    /// `original_source/tilapia.cpp`'s "Read too many TCP options" throw;
    /// the one intentional in-loop fatal per spec.md §7.
    #[error("tcp options overran data offset: read to {actual}, expected {expected}")]
    Overrun {
        /// The data-offset boundary options were supposed to end at.
        expected: usize,
        /// Where the cursor actually ended up.
        actual: usize,
    },
}

impl TcpOption {
    /// Parses one option, advancing `reader` past it.
    pub fn parse(reader: &mut WireReader<'_>) -> Result<Self, TcpOptionError> {
        let kind = reader.u8()?;
        match kind {
            0 => Ok(Self::EndOfOptions),
            1 => Ok(Self::NoOp),
            2 => {
                let _len = reader.u8()?;
                Ok(Self::Mss(reader.u16()?))
            }
            3 => {
                let _len = reader.u8()?;
                Ok(Self::WindowScale(reader.u8()?))
            }
            4 => {
                let _len = reader.u8()?;
                Ok(Self::SAckPermitted)
            }
            8 => {
                let _len = reader.u8()?;
                let value = reader.u32()?;
                let echo = reader.u32()?;
                Ok(Self::Timestamps(value, echo))
            }
            other => Err(TcpOptionError::Unsupported(other)),
        }
    }

    /// Serializes this option onto `writer`. Fails only for variants this
    /// enum cannot represent on emit, which is none today — kept `Result`
    /// so a future variant that can't be unambiguously re-encoded doesn't
    /// need a signature change.
    pub fn write(&self, writer: &mut WireWriter) -> Result<(), TcpOptionError> {
        match *self {
            Self::EndOfOptions => {
                writer.u8(0);
            }
            Self::NoOp => {
                writer.u8(1);
            }
            Self::Mss(value) => {
                writer.u8(2).u8(4).u16(value);
            }
            Self::WindowScale(value) => {
                writer.u8(3).u8(3).u8(value);
            }
            Self::SAckPermitted => {
                writer.u8(4).u8(2);
            }
            Self::Timestamps(value, echo) => {
                writer.u8(8).u8(10).u32(value).u32(echo);
            }
        }
        Ok(())
    }
}

/// Parses every option in `[reader.position(), end_offset)`, by repeatedly
/// reading one [`TcpOption`] until the cursor reaches `end_offset` exactly.
/// An option whose fixed size overruns `end_offset` is a fatal error, not a
/// silently-truncated options list: the cursor landing anywhere but exactly
/// `end_offset` means the data-offset field lied about the options span.
pub fn parse_options(
    reader: &mut WireReader<'_>,
    end_offset: usize,
) -> Result<Vec<TcpOption>, TcpOptionError> {
    let mut options = Vec::new();
    while reader.position() < end_offset {
        options.push(TcpOption::parse(reader)?);
    }
    if reader.position() != end_offset {
        return Err(TcpOptionError::Overrun {
            expected: end_offset,
            actual: reader.position(),
        });
    }
    Ok(options)
}

/// State tracked for one local listening port: the next sequence number we
/// will emit, and the last ack number we actually sent (to suppress
/// duplicate ACKs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpEndpoint {
    /// Our local port (the destination port of inbound segments).
    pub local_port: u16,
    /// The remote peer's port.
    pub peer_port: u16,
    /// Next sequence number this endpoint will send.
    pub next_seq: u32,
    /// Last ack number actually emitted; `None` until the first response.
    pub last_ack: Option<u32>,
}

impl TcpEndpoint {
    fn new(local_port: u16, peer_port: u16) -> Self {
        Self {
            local_port,
            peer_port,
            next_seq: 8000,
            last_ack: None,
        }
    }
}

/// Per-destination-port endpoint table driving handshake/ACK responses.
/// Entries are created on first sight of a packet for an unknown local
/// port and are never evicted.
#[derive(Debug, Default)]
pub struct TcpEndpointTable {
    endpoints: HashMap<u16, TcpEndpoint>,
}

impl TcpEndpointTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a previously-created endpoint, for diagnostics/tests.
    pub fn get(&self, local_port: u16) -> Option<&TcpEndpoint> {
        self.endpoints.get(&local_port)
    }

    /// Processes one inbound segment for `header.dest_port` (our local
    /// port), given the payload length in bytes. Returns the response
    /// header to send, or `None` if the response would be a duplicate ACK.
    pub fn on_message(&mut self, header: &TcpHeader, payload_size: usize) -> Option<TcpHeader> {
        let endpoint = self
            .endpoints
            .entry(header.dest_port)
            .or_insert_with(|| TcpEndpoint::new(header.dest_port, header.source_port));

        let mut response = TcpHeader {
            source_port: header.dest_port,
            dest_port: header.source_port,
            sequence_no: endpoint.next_seq,
            ack_no: header.sequence_no.wrapping_add(payload_size as u32),
            data_offset_reserved: TcpHeader::pack_data_offset(5),
            flags: TcpFlags::default(),
            window: header.window,
            checksum: 0,
            urgent_pointer: 0,
        };
        response.flags.set_ack(true);

        if header.flags.get_syn() {
            debug_assert_eq!(payload_size, 0, "SYN segments carry no payload");
            response.flags.set_syn(true);
            response.ack_no = header.sequence_no.wrapping_add(1);
            response.sequence_no = endpoint.next_seq;
            endpoint.next_seq = endpoint.next_seq.wrapping_add(1);
        }

        if endpoint.last_ack == Some(response.ack_no) {
            return None;
        }

        endpoint.last_ack = Some(response.ack_no);
        Some(response)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn flags_round_trip_through_bit_accessors() {
        let mut flags = TcpFlags::default();
        flags.set_syn(true);
        flags.set_ack(true);
        assert!(flags.get_syn());
        assert!(flags.get_ack());
        assert!(!flags.get_fin());
        assert_eq!(flags.raw(), 0b0001_0010);
    }

    #[test]
    fn header_round_trips_through_wire() {
        let mut flags = TcpFlags::default();
        flags.set_syn(true);
        let hdr = TcpHeader {
            source_port: 49250,
            dest_port: 80,
            sequence_no: 123,
            ack_no: 0,
            data_offset_reserved: TcpHeader::pack_data_offset(5),
            flags,
            window: 64240,
            checksum: 0,
            urgent_pointer: 0,
        };
        let mut w = WireWriter::new();
        hdr.write(&mut w);
        let bytes = w.into_vec();
        assert_eq!(bytes.len(), TcpHeader::WIRE_SIZE);

        let mut r = WireReader::new(&bytes);
        let parsed = TcpHeader::parse(&mut r).unwrap();
        assert_eq!(parsed, hdr);
        assert_eq!(parsed.data_offset(), 5);
    }

    #[test]
    fn options_parse_the_full_handshake_set() {
        let mut w = WireWriter::new();
        TcpOption::Mss(1460).write(&mut w).unwrap();
        TcpOption::SAckPermitted.write(&mut w).unwrap();
        TcpOption::Timestamps(12345, 0).write(&mut w).unwrap();
        TcpOption::NoOp.write(&mut w).unwrap();
        TcpOption::WindowScale(7).write(&mut w).unwrap();
        let bytes = w.into_vec();

        let mut r = WireReader::new(&bytes);
        let options = parse_options(&mut r, bytes.len()).unwrap();
        assert_eq!(
            options,
            vec![
                TcpOption::Mss(1460),
                TcpOption::SAckPermitted,
                TcpOption::Timestamps(12345, 0),
                TcpOption::NoOp,
                TcpOption::WindowScale(7),
            ]
        );
    }

    #[test]
    fn option_overrunning_the_data_offset_is_fatal() {
        // A single Mss option (4 bytes) claimed to end after only 2 bytes:
        // `TcpOption::parse` reads past `end_offset` before the loop notices.
        let mut w = WireWriter::new();
        TcpOption::Mss(1460).write(&mut w).unwrap();
        let bytes = w.into_vec();

        let mut r = WireReader::new(&bytes);
        let err = parse_options(&mut r, 2).unwrap_err();
        assert_eq!(
            err,
            TcpOptionError::Overrun {
                expected: 2,
                actual: 4,
            }
        );
    }

    #[test]
    fn syn_bumps_next_seq_and_acks_seq_plus_one() {
        let mut table = TcpEndpointTable::new();
        let mut syn = TcpHeader {
            source_port: 51000,
            dest_port: 80,
            sequence_no: 100,
            ack_no: 0,
            data_offset_reserved: TcpHeader::pack_data_offset(5),
            flags: TcpFlags::default(),
            window: 1024,
            checksum: 0,
            urgent_pointer: 0,
        };
        syn.flags.set_syn(true);

        let response = table.on_message(&syn, 0).expect("syn gets a syn-ack");
        assert!(response.flags.get_syn());
        assert!(response.flags.get_ack());
        assert_eq!(response.sequence_no, 8000);
        assert_eq!(response.ack_no, 101);
        assert_eq!(table.get(80).unwrap().next_seq, 8001);
    }

    #[test]
    fn duplicate_ack_is_suppressed() {
        let mut table = TcpEndpointTable::new();
        let data = TcpHeader {
            source_port: 51000,
            dest_port: 80,
            sequence_no: 500,
            ack_no: 0,
            data_offset_reserved: TcpHeader::pack_data_offset(5),
            flags: TcpFlags::default(),
            window: 1024,
            checksum: 0,
            urgent_pointer: 0,
        };

        let first = table.on_message(&data, 10);
        assert!(first.is_some());
        let second = table.on_message(&data, 10);
        assert_eq!(second, None);
    }

    #[test]
    fn pseudo_header_round_trips() {
        let pseudo = TcpPseudoHeader::new([10, 0, 0, 1], [10, 0, 0, 2], 40);
        let mut w = WireWriter::new();
        pseudo.write(&mut w);
        assert_eq!(w.len(), TcpPseudoHeader::WIRE_SIZE);
    }
}
