//! Byte order of a RIFF (little-endian) or RIFX (big-endian) container.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Byte order fixed once from the container tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Select the byte order from a 4-byte container tag.
    pub fn from_riff_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"RIFF" => Some(Endian::Little),
            b"RIFX" => Some(Endian::Big),
            _ => None,
        }
    }

    /// Read a `u16` from the first two bytes of `buf`.
    pub fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(buf),
            Endian::Big => BigEndian::read_u16(buf),
        }
    }

    /// Read a `u32` from the first four bytes of `buf`.
    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(buf),
            Endian::Big => BigEndian::read_u32(buf),
        }
    }
}
