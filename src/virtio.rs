//! The virtio-net header optionally carried in host byte order ahead of
//! every TAP frame when offload negotiation is enabled. See `virtio-net`
//! in the VIRTIO specification.

use crate::wire::{assert_layout, WireError, WireHeader, WireReader, WireWriter};

/// 12-byte virtio-net header. Fields are host byte order on the wire, so
/// [`WireHeader::FIELD_WIDTHS`] is empty: the "do not swap" sentinel from
/// §4.1 of the wire codec design.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtioNetHeader {
    /// Offload flags (`NEEDS_CSUM` / `DATA_VALID` / ...).
    pub flags: u8,
    /// Generic segment offload type.
    pub gso_type: u8,
    /// Length of the headers preceding any payload subject to GSO.
    pub hdr_len: u16,
    /// Segment size for TSO/UFO.
    pub gso_size: u16,
    /// Bytes from the start of the header to the first byte needing a
    /// checksum.
    pub csum_start: u16,
    /// Offset from `csum_start` to where the checksum should be stored.
    pub csum_offset: u16,
    /// Number of coalesced buffers; always 1 for a single frame.
    pub num_bufs: u16,
}

impl WireHeader for VirtioNetHeader {
    const FIELD_WIDTHS: &'static [usize] = &[];
    const WIRE_SIZE: usize = 12;
    const NAME: &'static str = "VirtioNetHeader";
}

const _: () = assert_layout::<VirtioNetHeader>();

impl VirtioNetHeader {
    /// Parses a 12-byte virtio-net header in host byte order.
    pub fn parse(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let flags = reader.u8()?;
        let gso_type = reader.u8()?;
        let hdr_len = reader.u16_ne()?;
        let gso_size = reader.u16_ne()?;
        let csum_start = reader.u16_ne()?;
        let csum_offset = reader.u16_ne()?;
        let num_bufs = reader.u16_ne()?;
        Ok(Self {
            flags,
            gso_type,
            hdr_len,
            gso_size,
            csum_start,
            csum_offset,
            num_bufs,
        })
    }

    /// Serializes this header onto `writer`, in host byte order.
    pub fn write(&self, writer: &mut WireWriter) {
        writer
            .u8(self.flags)
            .u8(self.gso_type)
            .u16_ne(self.hdr_len)
            .u16_ne(self.gso_size)
            .u16_ne(self.csum_start)
            .u16_ne(self.csum_offset)
            .u16_ne(self.num_bufs);
    }
}
