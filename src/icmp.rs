//! ICMPv4: only the echo request/reply pair is handled.
//! <https://www.rfc-editor.org/rfc/rfc792>

use crate::checksum::Checksum;
use crate::struct_variants;
use crate::wire::{assert_layout, WireError, WireHeader, WireReader, WireWriter};

struct_variants! {
  IcmpType, icmp_type, u8:
    /// Echo reply (ping response)
    ECHO_REPLY              => 0x00,
    /// Destination unreachable (named, not generated by this stack)
    DESTINATION_UNREACHABLE => 0x03,
    /// Echo request (ping)
    ECHO_REQUEST            => 0x08,
}

/// The fixed 4-byte ICMP header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IcmpHeader {
    /// Message type.
    pub icmp_type: IcmpType,
    /// Type-specific code; 0 for echo request/reply.
    pub code: u8,
    /// Checksum over header + body.
    pub checksum: u16,
}

impl WireHeader for IcmpHeader {
    const FIELD_WIDTHS: &'static [usize] = &[1, 1, 2];
    const WIRE_SIZE: usize = 4;
    const NAME: &'static str = "IcmpHeader";
}

const _: () = assert_layout::<IcmpHeader>();

impl IcmpHeader {
    /// Parses a 4-byte ICMP header.
    pub fn parse(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let icmp_type = IcmpType::new(reader.u8()?);
        let code = reader.u8()?;
        let checksum = reader.u16()?;
        Ok(Self {
            icmp_type,
            code,
            checksum,
        })
    }

    /// Serializes this header onto `writer`.
    pub fn write(&self, writer: &mut WireWriter) {
        writer
            .u8(self.icmp_type.icmp_type())
            .u8(self.code)
            .u16(self.checksum);
    }
}

/// The 4-byte id/sequence pair preceding an echo request/reply's opaque
/// payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IcmpEchoBody {
    /// Identifier, chosen by the sender to match replies to requests.
    pub id: u16,
    /// Sequence number, incremented per echo.
    pub seq: u16,
}

impl WireHeader for IcmpEchoBody {
    const FIELD_WIDTHS: &'static [usize] = &[2, 2];
    const WIRE_SIZE: usize = 4;
    const NAME: &'static str = "IcmpEchoBody";
}

const _: () = assert_layout::<IcmpEchoBody>();

impl IcmpEchoBody {
    /// Parses the 4-byte id/seq pair.
    pub fn parse(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let id = reader.u16()?;
        let seq = reader.u16()?;
        Ok(Self { id, seq })
    }

    /// Serializes this body onto `writer`.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.u16(self.id).u16(self.seq);
    }
}

/// Builds an echo reply for an inbound echo request, copying the opaque
/// payload verbatim and recomputing the checksum over header + echo body +
/// payload. Returns `None` for any type other than [`IcmpType::ECHO_REQUEST`].
pub fn echo_reply(
    header: &IcmpHeader,
    echo: &IcmpEchoBody,
    payload: &[u8],
) -> Option<(IcmpHeader, IcmpEchoBody, Vec<u8>)> {
    if header.icmp_type != IcmpType::ECHO_REQUEST {
        return None;
    }

    let mut reply_header = *header;
    reply_header.icmp_type = IcmpType::ECHO_REPLY;
    reply_header.checksum = 0;

    let mut writer = WireWriter::with_capacity(IcmpHeader::WIRE_SIZE + IcmpEchoBody::WIRE_SIZE);
    reply_header.write(&mut writer);
    echo.write(&mut writer);
    let mut checksum = Checksum::new();
    checksum.add(&writer.into_vec());
    checksum.add(payload);
    reply_header.checksum = checksum.finalize();

    Some((reply_header, *echo, payload.to_vec()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn echo_request_gets_a_reply_with_payload_preserved() {
        let header = IcmpHeader {
            icmp_type: IcmpType::ECHO_REQUEST,
            code: 0,
            checksum: 0,
        };
        let echo = IcmpEchoBody { id: 1, seq: 1 };
        let payload: Vec<u8> = (0u8..32).collect();

        let (reply_header, reply_echo, reply_payload) =
            echo_reply(&header, &echo, &payload).expect("echo request replies");

        assert_eq!(reply_header.icmp_type, IcmpType::ECHO_REPLY);
        assert_eq!(reply_echo, echo);
        assert_eq!(reply_payload, payload);

        let mut w = WireWriter::new();
        let mut zeroed = reply_header;
        zeroed.checksum = 0;
        zeroed.write(&mut w);
        reply_echo.write(&mut w);
        w.bytes(&reply_payload);
        assert_eq!(Checksum::new().add(&w.into_vec()).finalize(), reply_header.checksum);
    }

    #[test]
    fn non_echo_request_is_dropped() {
        let header = IcmpHeader {
            icmp_type: IcmpType::DESTINATION_UNREACHABLE,
            code: 0,
            checksum: 0,
        };
        let echo = IcmpEchoBody { id: 0, seq: 0 };
        assert_eq!(echo_reply(&header, &echo, &[]), None);
    }

    #[test]
    fn header_and_body_round_trip() {
        let header = IcmpHeader {
            icmp_type: IcmpType::ECHO_REQUEST,
            code: 0,
            checksum: 0xABCD,
        };
        let mut w = WireWriter::new();
        header.write(&mut w);
        let bytes = w.into_vec();
        let mut r = WireReader::new(&bytes);
        assert_eq!(IcmpHeader::parse(&mut r).unwrap(), header);

        let echo = IcmpEchoBody { id: 7, seq: 9 };
        let mut w = WireWriter::new();
        echo.write(&mut w);
        let bytes = w.into_vec();
        let mut r = WireReader::new(&bytes);
        assert_eq!(IcmpEchoBody::parse(&mut r).unwrap(), echo);
    }
}
