//! IPv4 header parsing. Bitfields that share a byte (version/IHL) or a
//! 16-bit field (flags/fragment-offset) are exposed as explicit mask/shift
//! accessors on the already-byte-swapped value rather than as a packed
//! bitfield struct, which is endianness-fragile across compilers.

use crate::checksum::Checksum;
use crate::ip_protocol::IPProtocol;
use crate::wire::{assert_layout, WireError, WireHeader, WireReader, WireWriter};

/// A parsed 20-byte IPv4 header. Options (IHL != 5) are not supported; the
/// dispatcher rejects them before constructing one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IPv4Header {
    /// Combined version (high nibble) / IHL in 32-bit words (low nibble).
    pub version_ihl: u8,
    /// Type of service / DSCP+ECN byte, carried opaque.
    pub tos: u8,
    /// Total length of header + payload, in bytes.
    pub total_length: u16,
    /// Identification, for fragment reassembly.
    pub id: u16,
    /// Combined flags (high 3 bits) / fragment offset (low 13 bits).
    pub flags_frag_off: u16,
    /// Time to live.
    pub ttl: u8,
    /// Encapsulated protocol.
    pub protocol: IPProtocol,
    /// Header checksum.
    pub checksum: u16,
    /// Source address.
    pub src_ip: [u8; 4],
    /// Destination address.
    pub dst_ip: [u8; 4],
}

impl WireHeader for IPv4Header {
    const FIELD_WIDTHS: &'static [usize] = &[1, 1, 2, 2, 2, 1, 1, 2, 4, 4];
    const WIRE_SIZE: usize = 20;
    const NAME: &'static str = "IPv4Header";
}

const _: () = assert_layout::<IPv4Header>();

impl IPv4Header {
    /// High nibble of `version_ihl`.
    pub fn version(&self) -> u8 {
        self.version_ihl >> 4
    }

    /// Low nibble of `version_ihl`, the header length in 32-bit words.
    pub fn ihl(&self) -> u8 {
        self.version_ihl & 0x0F
    }

    /// Header length in bytes (`ihl() * 4`).
    pub fn header_len(&self) -> usize {
        usize::from(self.ihl()) * 4
    }

    /// High 3 bits of `flags_frag_off`.
    pub fn flags(&self) -> u8 {
        (self.flags_frag_off >> 13) as u8
    }

    /// Low 13 bits of `flags_frag_off`.
    pub fn fragment_offset(&self) -> u16 {
        self.flags_frag_off & 0x1FFF
    }

    /// Packs `version` (4 bits) and `ihl` (4 bits) into the combined byte.
    pub fn pack_version_ihl(version: u8, ihl: u8) -> u8 {
        (version << 4) | (ihl & 0x0F)
    }

    /// Packs `flags` (3 bits) and `fragment_offset` (13 bits) into the
    /// combined field.
    pub fn pack_flags_frag_off(flags: u8, fragment_offset: u16) -> u16 {
        (u16::from(flags) << 13) | (fragment_offset & 0x1FFF)
    }

    /// Parses a 20-byte IPv4 header (no options).
    pub fn parse(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let version_ihl = reader.u8()?;
        let tos = reader.u8()?;
        let total_length = reader.u16()?;
        let id = reader.u16()?;
        let flags_frag_off = reader.u16()?;
        let ttl = reader.u8()?;
        let protocol = IPProtocol::new(reader.u8()?);
        let checksum = reader.u16()?;
        let src_ip = reader.bytes4()?;
        let dst_ip = reader.bytes4()?;
        Ok(Self {
            version_ihl,
            tos,
            total_length,
            id,
            flags_frag_off,
            ttl,
            protocol,
            checksum,
            src_ip,
            dst_ip,
        })
    }

    /// Serializes this header onto `writer`, writing `self.checksum` as-is
    /// (callers recompute it first via [`IPv4Header::compute_checksum`]).
    pub fn write(&self, writer: &mut WireWriter) {
        writer
            .u8(self.version_ihl)
            .u8(self.tos)
            .u16(self.total_length)
            .u16(self.id)
            .u16(self.flags_frag_off)
            .u8(self.ttl)
            .u8(self.protocol.protocol())
            .u16(self.checksum)
            .bytes(&self.src_ip)
            .bytes(&self.dst_ip);
    }

    /// Computes this header's checksum with the checksum field zeroed,
    /// per the RFC 1071 engine.
    pub fn compute_checksum(&self) -> u16 {
        let mut zeroed = *self;
        zeroed.checksum = 0;
        let mut writer = WireWriter::with_capacity(Self::WIRE_SIZE);
        zeroed.write(&mut writer);
        Checksum::new().add(&writer.into_vec()).finalize()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample() -> IPv4Header {
        IPv4Header {
            version_ihl: IPv4Header::pack_version_ihl(4, 5),
            tos: 0,
            total_length: 0x73,
            id: 0,
            flags_frag_off: IPv4Header::pack_flags_frag_off(0b010, 0),
            ttl: 0x40,
            protocol: IPProtocol::UDP,
            checksum: 0,
            src_ip: [0xc0, 0xa8, 0x00, 0x01],
            dst_ip: [0xc0, 0xa8, 0x00, 0xc7],
        }
    }

    #[test]
    fn version_and_ihl_round_trip() {
        let hdr = sample();
        assert_eq!(hdr.version(), 4);
        assert_eq!(hdr.ihl(), 5);
        assert_eq!(hdr.header_len(), 20);
    }

    #[test]
    fn flags_and_fragment_offset_round_trip() {
        let hdr = sample();
        assert_eq!(hdr.flags(), 0b010);
        assert_eq!(hdr.fragment_offset(), 0);
    }

    #[test]
    fn checksum_matches_rfc1071_vector() {
        let hdr = sample();
        assert_eq!(hdr.compute_checksum(), 0xb861);
    }

    #[test]
    fn parse_and_write_round_trip() {
        let hdr = sample();
        let mut w = WireWriter::new();
        hdr.write(&mut w);
        let bytes = w.into_vec();
        assert_eq!(bytes.len(), IPv4Header::WIRE_SIZE);

        let mut r = WireReader::new(&bytes);
        assert_eq!(IPv4Header::parse(&mut r).unwrap(), hdr);
    }
}
