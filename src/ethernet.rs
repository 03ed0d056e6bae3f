//! Ethernet II framing: destination MAC, source MAC, EtherType.
//! <https://en.wikipedia.org/wiki/Ethernet_frame>

use crate::ether_type::EtherType;
use crate::wire::{assert_layout, WireError, WireHeader, WireReader, WireWriter};

/// A parsed Ethernet II header. No 802.1Q VLAN tag support: the dispatcher
/// this crate builds treats a VLAN-tagged frame's TCI like any other payload
/// byte, rather than threading an optional extra field through every header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EthernetHeader {
    /// MAC destination.
    pub destination: [u8; 6],
    /// MAC source.
    pub source: [u8; 6],
    /// EtherType of the encapsulated protocol.
    pub ether_type: EtherType,
}

impl WireHeader for EthernetHeader {
    const FIELD_WIDTHS: &'static [usize] = &[6, 6, 2];
    const WIRE_SIZE: usize = 14;
    const NAME: &'static str = "EthernetHeader";
}

const _: () = assert_layout::<EthernetHeader>();

impl EthernetHeader {
    /// Parses a 14-byte Ethernet II header off the front of `buf`.
    pub fn parse(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let destination = reader.bytes6()?;
        let source = reader.bytes6()?;
        let ether_type = EtherType::new(reader.u16()?);
        Ok(Self {
            destination,
            source,
            ether_type,
        })
    }

    /// Serializes this header onto `writer`.
    pub fn write(&self, writer: &mut WireWriter) {
        writer
            .bytes(&self.destination)
            .bytes(&self.source)
            .u16(self.ether_type.ether_type());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_ipv4_frame_header() {
        let bytes = [
            0x00, 0x23, 0x54, 0x07, 0x93, 0x6C, 0x00, 0x1B, 0x21, 0x0F, 0x91, 0x9B, 0x08, 0x00,
        ];
        let mut r = WireReader::new(&bytes);
        let hdr = EthernetHeader::parse(&mut r).unwrap();
        assert_eq!(
            hdr,
            EthernetHeader {
                destination: [0x00, 0x23, 0x54, 0x07, 0x93, 0x6C],
                source: [0x00, 0x1B, 0x21, 0x0F, 0x91, 0x9B],
                ether_type: EtherType::IPV4,
            }
        );
        assert_eq!(r.position(), EthernetHeader::WIRE_SIZE);
    }

    #[test]
    fn round_trips_through_write() {
        let hdr = EthernetHeader {
            destination: [0xaa, 0xbb, 0xbb, 0x00, 0x00, 0xdd],
            source: [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01],
            ether_type: EtherType::ARP,
        };
        let mut w = WireWriter::new();
        hdr.write(&mut w);
        let bytes = w.into_vec();
        assert_eq!(bytes.len(), EthernetHeader::WIRE_SIZE);

        let mut r = WireReader::new(&bytes);
        assert_eq!(EthernetHeader::parse(&mut r).unwrap(), hdr);
    }

    #[test]
    fn short_buffer_is_reported() {
        let bytes = [0u8; 10];
        let mut r = WireReader::new(&bytes);
        assert!(EthernetHeader::parse(&mut r).is_err());
    }
}
