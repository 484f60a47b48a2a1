//! Incremental RIFF chunk scanning up to the start of the `data` chunk.

use crate::endian::Endian;
use crate::error::{WemError, WemResult};
use crate::format::{ContainerHeader, FormatInfo, LoopPoints, RIFF_HEADER_SIZE, VorbInfo};
use std::io::Read;

/// Size of a chunk header: 4 byte tag and 4 byte size.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Everything known about a stream once its `data` chunk has been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub header: ContainerHeader,
    pub format: FormatInfo,
    pub vorb: VorbInfo,
    pub loop_points: Option<LoopPoints>,
    /// File offset of the first byte of the `data` chunk body.
    pub data_offset: u64,
    pub data_size: u32,
}

impl StreamInfo {
    pub fn endian(&self) -> Endian {
        self.header.endian
    }
}

/// Walks the container header and chunk list as input arrives.
///
/// Chunks the decoder needs (`fmt `, `vorb`, `smpl`) are buffered whole; any
/// other chunk body is dropped as it arrives.
#[derive(Debug, Default)]
pub struct ChunkScanner {
    pending: Vec<u8>,
    /// File offset of `pending[0]`.
    offset: u64,
    skip_remaining: u64,
    header: Option<ContainerHeader>,
    format: Option<FormatInfo>,
    vorb: Option<VorbInfo>,
    loop_points: Option<LoopPoints>,
}

impl ChunkScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The container header, once the first 12 bytes have been validated.
    pub fn header(&self) -> Option<&ContainerHeader> {
        self.header.as_ref()
    }

    pub fn format(&self) -> Option<&FormatInfo> {
        self.format.as_ref()
    }

    /// Feed more input.
    ///
    /// Returns the stream info and any bytes that followed the `data` chunk
    /// header once that header has been seen, `None` while still scanning.
    pub fn push(&mut self, input: &[u8]) -> WemResult<Option<(StreamInfo, Vec<u8>)>> {
        let skipped = (self.skip_remaining as usize).min(input.len());
        self.skip_remaining -= skipped as u64;
        self.offset += skipped as u64;
        self.pending.extend_from_slice(&input[skipped..]);

        let mut pos = 0usize;
        let result = self.scan(&mut pos);
        self.pending.drain(..pos);
        self.offset += pos as u64;

        match result? {
            Some(info) => Ok(Some((info, std::mem::take(&mut self.pending)))),
            None => Ok(None),
        }
    }

    fn scan(&mut self, pos: &mut usize) -> WemResult<Option<StreamInfo>> {
        let header = match self.header {
            Some(header) => header,
            None => {
                if self.pending.len() < RIFF_HEADER_SIZE {
                    return Ok(None);
                }
                let header = ContainerHeader::parse(&self.pending[..RIFF_HEADER_SIZE])?;
                tracing::debug!(
                    "Container header: {:?}, RIFF size {:#x}",
                    header.endian,
                    header.riff_size
                );
                self.header = Some(header);
                *pos = RIFF_HEADER_SIZE;
                header
            }
        };
        let endian = header.endian;

        while self.skip_remaining == 0 {
            let Some(chunk_header) = self.pending.get(*pos..*pos + CHUNK_HEADER_SIZE) else {
                return Ok(None);
            };
            let mut tag = [0u8; 4];
            tag.copy_from_slice(&chunk_header[..4]);
            let size = endian.read_u32(&chunk_header[4..]);
            let chunk_offset = self.offset + *pos as u64;
            let body_start = *pos + CHUNK_HEADER_SIZE;

            match &tag {
                b"data" => {
                    *pos = body_start;
                    let info = self.finish_scan(header, chunk_offset, size)?;
                    return Ok(Some(info));
                }
                b"fmt " | b"vorb" | b"smpl" => {
                    let body_end = body_start + size as usize;
                    let Some(body) = self.pending.get(body_start..body_end) else {
                        return Ok(None);
                    };
                    tracing::debug!(
                        "Chunk '{}' at {:#x}, {} bytes",
                        String::from_utf8_lossy(&tag),
                        chunk_offset,
                        size
                    );
                    match &tag {
                        b"fmt " => self.format = Some(FormatInfo::parse(body, endian)?),
                        b"vorb" => self.vorb = Some(VorbInfo::parse(body, endian)?),
                        _ => self.loop_points = LoopPoints::parse(body, endian)?,
                    }
                    *pos = body_end;
                }
                _ => {
                    let available = self.pending.len() - body_start;
                    let skipped = available.min(size as usize);
                    tracing::trace!(
                        "Skipping chunk '{}' at {:#x}, {} bytes",
                        String::from_utf8_lossy(&tag),
                        chunk_offset,
                        size
                    );
                    *pos = body_start + skipped;
                    self.skip_remaining = size as u64 - skipped as u64;
                }
            }
        }

        Ok(None)
    }

    fn finish_scan(
        &self,
        header: ContainerHeader,
        chunk_offset: u64,
        data_size: u32,
    ) -> WemResult<StreamInfo> {
        let format = self
            .format
            .ok_or_else(|| WemError::parse("data chunk before fmt chunk"))?;
        let vorb = format
            .vorb
            .or(self.vorb)
            .ok_or_else(|| WemError::unsupported("missing vorb extension"))?;

        if vorb.setup_packet_offset >= data_size || vorb.first_audio_packet_offset > data_size {
            return Err(WemError::parse(format!(
                "packet offsets {:#x}/{:#x} outside data chunk of {:#x} bytes",
                vorb.setup_packet_offset, vorb.first_audio_packet_offset, data_size
            )));
        }

        let data_offset = chunk_offset + CHUNK_HEADER_SIZE as u64;
        let file_end = data_offset + data_size as u64;
        if header.riff_size as u64 + 8 < file_end {
            tracing::warn!(
                "RIFF size {:#x} is smaller than the data chunk end {:#x}",
                header.riff_size,
                file_end
            );
        }

        tracing::debug!(
            "{} channels, {} Hz, {} samples, block sizes {}/{}, data chunk {:#x} bytes at {:#x}",
            format.channels,
            format.sample_rate,
            vorb.sample_count,
            vorb.blocksize_0(),
            vorb.blocksize_1(),
            data_size,
            data_offset
        );

        Ok(StreamInfo {
            header,
            format,
            vorb,
            loop_points: self.loop_points,
            data_offset,
            data_size,
        })
    }
}

/// Read just far enough into `reader` to describe the stream.
pub fn probe<R: Read>(mut reader: R, chunk_size: usize) -> WemResult<StreamInfo> {
    let mut scanner = ChunkScanner::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            return Err(if scanner.header().is_none() {
                WemError::incomplete("no container header")
            } else {
                WemError::incomplete("no data chunk")
            });
        }
        if let Some((info, _)) = scanner.push(&buffer[..n])? {
            return Ok(info);
        }
    }
}
