//! Wwise packet framing and the logical packets handed to the Ogg muxer.
//!
//! Inside the `data` chunk every packet is prefixed by a 2 byte size in the
//! container's byte order. There is no granule field.

use crate::endian::Endian;

/// Size of the native packet header.
pub const PACKET_HEADER_SIZE: u64 = 2;

/// Native packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// Offset of the size prefix.
    pub header_offset: u64,
    /// Offset of the packet payload data.
    pub offset: u64,
    /// Size of the packet payload in bytes.
    pub size: u32,
}

impl Packet {
    /// Read a packet header at absolute `offset`, where `buf` starts at absolute `base`.
    ///
    /// Returns `None` if the 2 byte header isn't available in `buf` yet.
    pub fn read(buf: &[u8], base: u64, offset: u64, endian: Endian) -> Option<Self> {
        let start = offset.checked_sub(base)? as usize;
        let header = buf.get(start..start + PACKET_HEADER_SIZE as usize)?;

        Some(Self {
            header_offset: offset,
            offset: offset + PACKET_HEADER_SIZE,
            size: endian.read_u16(header) as u32,
        })
    }

    /// Offset of the next packet header.
    pub fn next_offset(&self) -> u64 {
        self.offset + self.size as u64
    }

    /// The payload bytes, if they are all present in `buf` (which starts at `base`).
    pub fn payload<'a>(&self, buf: &'a [u8], base: u64) -> Option<&'a [u8]> {
        let start = self.offset.checked_sub(base)? as usize;
        buf.get(start..start + self.size as usize)
    }
}

/// A Vorbis packet ready to be paged by an Ogg muxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPacket {
    pub data: Vec<u8>,
    /// Beginning of stream.
    pub bos: bool,
    /// End of stream.
    pub eos: bool,
    pub granule_position: u64,
    /// Sequence number; 0..=2 are the header packets.
    pub packet_no: u64,
    /// Hint to close the current page after this packet.
    pub flush: bool,
}
