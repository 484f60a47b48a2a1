//! RIFF header and chunk payload parsing.
//!
//! Wwise Vorbis files carry the stream parameters in the `fmt ` chunk. The Wwise
//! "vorb" extension is either embedded in a 0x42 byte `fmt ` chunk at offset 0x18
//! or stored in a separate `vorb` chunk with the same layout.

use crate::endian::Endian;
use crate::error::{WemError, WemResult};

/// Length of the `RIFF`/`RIFX` + size + `WAVE` header.
pub const RIFF_HEADER_SIZE: usize = 12;

/// Codec id of Wwise Vorbis in the `fmt ` chunk.
pub const WWISE_VORBIS_CODEC: u16 = 0xFFFF;

/// `fmt ` chunk size that carries an embedded vorb extension.
pub const FMT_SIZE_WITH_VORB: usize = 0x42;

/// Offset of the vorb extension inside a 0x42 byte `fmt ` chunk.
pub const FMT_VORB_OFFSET: usize = 0x18;

/// Size of the vorb extension layout this crate understands.
pub const VORB_SIZE: usize = 0x2A;

/// Mod-signal values that mark standard (unmodified) Vorbis audio packets.
const STANDARD_PACKET_SIGNALS: [u32; 4] = [0x4A, 0x4B, 0x69, 0x70];

/// The 12 byte container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub endian: Endian,
    /// Declared RIFF size, counting from the end of the size field.
    pub riff_size: u32,
}

impl ContainerHeader {
    /// Parse the first 12 bytes of the container.
    pub fn parse(header: &[u8]) -> WemResult<Self> {
        if header.len() < RIFF_HEADER_SIZE {
            return Err(WemError::container("header truncated"));
        }

        let endian = Endian::from_riff_tag(&header[0..4])
            .ok_or_else(|| WemError::container("missing RIFF"))?;
        let riff_size = endian.read_u32(&header[4..8]);

        if &header[8..12] != b"WAVE" {
            return Err(WemError::container("missing WAVE"));
        }

        Ok(Self { endian, riff_size })
    }
}

/// Wwise vorb extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VorbInfo {
    pub sample_count: u32,
    pub mod_signal: u32,
    /// Offset of the setup packet, relative to the start of the `data` chunk.
    pub setup_packet_offset: u32,
    /// Offset of the first audio packet, relative to the start of the `data` chunk.
    pub first_audio_packet_offset: u32,
    pub uid: u32,
    pub blocksize_0_pow: u8,
    pub blocksize_1_pow: u8,
}

impl VorbInfo {
    pub fn parse(chunk: &[u8], endian: Endian) -> WemResult<Self> {
        if chunk.len() < VORB_SIZE {
            return Err(WemError::unsupported(format!(
                "bad vorb size {:#x}",
                chunk.len()
            )));
        }

        let info = Self {
            sample_count: endian.read_u32(&chunk[0x00..]),
            mod_signal: endian.read_u32(&chunk[0x04..]),
            setup_packet_offset: endian.read_u32(&chunk[0x10..]),
            first_audio_packet_offset: endian.read_u32(&chunk[0x14..]),
            uid: endian.read_u32(&chunk[0x24..]),
            blocksize_0_pow: chunk[0x28],
            blocksize_1_pow: chunk[0x29],
        };

        let valid = 6..=13;
        if !valid.contains(&info.blocksize_0_pow)
            || !valid.contains(&info.blocksize_1_pow)
            || info.blocksize_0_pow > info.blocksize_1_pow
        {
            return Err(WemError::unsupported(format!(
                "invalid block sizes 2^{} / 2^{}",
                info.blocksize_0_pow, info.blocksize_1_pow
            )));
        }

        Ok(info)
    }

    /// Whether audio packets use the modified Wwise layout.
    pub fn mod_packets(&self) -> bool {
        !STANDARD_PACKET_SIGNALS.contains(&self.mod_signal)
    }

    pub fn blocksize_0(&self) -> u32 {
        1 << self.blocksize_0_pow
    }

    pub fn blocksize_1(&self) -> u32 {
        1 << self.blocksize_1_pow
    }
}

/// Stream parameters from the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_second: u32,
    pub subtype: u32,
    /// The vorb extension, if it was embedded in the `fmt ` chunk.
    pub vorb: Option<VorbInfo>,
}

impl FormatInfo {
    pub fn parse(chunk: &[u8], endian: Endian) -> WemResult<Self> {
        if chunk.len() < 0x12 {
            return Err(WemError::parse(format!(
                "fmt chunk too short ({:#x} bytes)",
                chunk.len()
            )));
        }

        let codec = endian.read_u16(&chunk[0..]);
        if codec != WWISE_VORBIS_CODEC {
            return Err(WemError::unsupported(format!("codec id {:#06x}", codec)));
        }

        let channels = endian.read_u16(&chunk[2..]);
        if channels == 0 {
            return Err(WemError::unsupported("zero channels"));
        }
        if channels > u8::MAX as u16 {
            return Err(WemError::unsupported(format!("{} channels", channels)));
        }

        let subtype = if chunk.len() >= 0x18 {
            endian.read_u32(&chunk[0x14..])
        } else {
            0
        };

        let vorb = if chunk.len() >= FMT_SIZE_WITH_VORB {
            Some(VorbInfo::parse(&chunk[FMT_VORB_OFFSET..], endian)?)
        } else {
            None
        };

        Ok(Self {
            channels,
            sample_rate: endian.read_u32(&chunk[4..]),
            avg_bytes_per_second: endian.read_u32(&chunk[8..]),
            subtype,
            vorb,
        })
    }
}

/// Loop points from a `smpl` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopPoints {
    pub start: u32,
    /// Inclusive end sample as stored; zero means "end of stream".
    pub end: u32,
}

impl LoopPoints {
    /// Parse a `smpl` chunk. Returns `None` unless it describes exactly one loop.
    pub fn parse(chunk: &[u8], endian: Endian) -> WemResult<Option<Self>> {
        if chunk.len() < 0x24 {
            return Err(WemError::parse("smpl chunk too short"));
        }

        let loop_count = endian.read_u32(&chunk[0x1C..]);
        if loop_count != 1 || chunk.len() < 0x34 {
            return Ok(None);
        }

        Ok(Some(Self {
            start: endian.read_u32(&chunk[0x2C..]),
            end: endian.read_u32(&chunk[0x30..]),
        }))
    }

    /// Resolve to a `[start, end)` sample range checked against the stream length.
    pub fn resolve(&self, sample_count: u32) -> WemResult<(u32, u32)> {
        let end = if self.end == 0 {
            sample_count
        } else {
            self.end.saturating_add(1)
        };

        if self.start >= sample_count || end > sample_count || self.start > end {
            return Err(WemError::parse("loops out of range"));
        }
        Ok((self.start, end))
    }
}
