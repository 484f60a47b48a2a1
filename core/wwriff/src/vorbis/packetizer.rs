//! Audio packet reconstruction.
//!
//! Audio packets follow the setup packet in the data chunk, each behind the
//! native 2 byte size prefix. Modified packets drop the packet type bit and the
//! window continuation flags of long blocks; those are restored here by peeking
//! at the following packet. Page hints and end of stream are derived from the
//! declared packet sizes alone, so the emitted sequence does not depend on how
//! the input was split.

use crate::bit_reader::BitReader;
use crate::bit_writer::BitWriter;
use crate::endian::Endian;
use crate::error::{WemError, WemResult};
use crate::format::VorbInfo;
use crate::sink::PacketSink;
use crate::vorbis::packet::{LogicalPacket, Packet};
use crate::vorbis::setup::ModeTable;

/// Packet number of the first audio packet, after the three headers.
pub const FIRST_AUDIO_PACKET_NO: u64 = 3;

/// Mutable decode position carried across input deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCursor {
    /// Data chunk offset of the next packet header.
    pub offset: u64,
    pub packet_no: u64,
    pub granule_position: u64,
    /// Block size of the previous audio packet, `None` before the first one.
    pub prev_blocksize: Option<u32>,
    pub prev_blockflag: bool,
    pub finished: bool,
}

impl StreamCursor {
    pub fn new(first_audio_packet_offset: u64) -> Self {
        Self {
            offset: first_audio_packet_offset,
            packet_no: FIRST_AUDIO_PACKET_NO,
            granule_position: 0,
            prev_blocksize: None,
            prev_blockflag: false,
            finished: false,
        }
    }
}

/// Emits audio packets from buffered data chunk bytes.
pub struct AudioPacketizer {
    modes: ModeTable,
    endian: Endian,
    mod_packets: bool,
    blocksizes: [u32; 2],
    data_end: u64,
    cursor: StreamCursor,
}

impl AudioPacketizer {
    pub fn new(
        modes: ModeTable,
        vorb: &VorbInfo,
        endian: Endian,
        mod_packets: bool,
        data_end: u64,
    ) -> Self {
        Self {
            modes,
            endian,
            mod_packets,
            blocksizes: [vorb.blocksize_0(), vorb.blocksize_1()],
            data_end,
            cursor: StreamCursor::new(vorb.first_audio_packet_offset as u64),
        }
    }

    pub fn cursor(&self) -> &StreamCursor {
        &self.cursor
    }

    /// Whether the final packet has been emitted.
    pub fn is_finished(&self) -> bool {
        self.cursor.finished
    }

    /// Emit every packet that can be completed from `buf`, which holds data chunk
    /// bytes starting at offset `base`.
    ///
    /// Stops at the first packet whose bytes (or the bytes it must peek at) are
    /// not in `buf` yet. Bytes before [`StreamCursor::offset`] are not needed
    /// again once this returns.
    pub fn drain<S: PacketSink + ?Sized>(
        &mut self,
        buf: &[u8],
        base: u64,
        sink: &mut S,
    ) -> WemResult<()> {
        while !self.cursor.finished {
            if self.cursor.offset >= self.data_end {
                return Err(WemError::parse(format!(
                    "no audio packet at {:#x}, data chunk ends at {:#x}",
                    self.cursor.offset, self.data_end
                )));
            }

            let Some(packet) = Packet::read(buf, base, self.cursor.offset, self.endian) else {
                break;
            };
            let next_offset = packet.next_offset();
            if next_offset > self.data_end {
                return Err(WemError::parse(format!(
                    "packet at {:#x} extends past the data chunk",
                    packet.header_offset
                )));
            }
            let Some(payload) = packet.payload(buf, base) else {
                break;
            };

            let eos = next_offset == self.data_end;
            let next = if eos {
                None
            } else {
                match Packet::read(buf, base, next_offset, self.endian) {
                    Some(next) => Some(next),
                    None => break,
                }
            };
            let second_to_last = next.is_some_and(|n| n.next_offset() == self.data_end);

            let Some(logical) = self.rebuild_packet(payload, next.as_ref(), buf, base)? else {
                break;
            };

            sink.accept(LogicalPacket {
                eos,
                flush: eos || second_to_last,
                ..logical
            })?;

            self.cursor.offset = next_offset;
            self.cursor.packet_no += 1;
            if eos {
                self.cursor.finished = true;
                tracing::debug!(
                    "Emitted final audio packet {} at granule {}",
                    self.cursor.packet_no - 1,
                    self.cursor.granule_position
                );
            }
        }

        Ok(())
    }

    /// Rebuild one packet, or `None` if the next packet's mode isn't available yet.
    fn rebuild_packet(
        &mut self,
        payload: &[u8],
        next: Option<&Packet>,
        buf: &[u8],
        base: u64,
    ) -> WemResult<Option<LogicalPacket>> {
        if payload.is_empty() {
            tracing::trace!("Empty audio packet {}", self.cursor.packet_no);
            return Ok(Some(self.logical(Vec::new())));
        }

        let mode = self.mode_number(payload);
        let long_window = self
            .modes
            .is_long(mode)
            .ok_or_else(|| WemError::parse(format!("invalid mode number {}", mode)))?;

        let data = if self.mod_packets {
            let next_blockflag = if long_window {
                match self.peek_next_blockflag(next, buf, base) {
                    Some(flag) => flag,
                    None => return Ok(None),
                }
            } else {
                false
            };
            self.rebuild_modified(payload, mode, long_window, next_blockflag)?
        } else {
            payload.to_vec()
        };

        let blocksize = self.blocksizes[long_window as usize];
        if let Some(prev_blocksize) = self.cursor.prev_blocksize {
            self.cursor.granule_position += ((prev_blocksize + blocksize) / 4) as u64;
        }
        self.cursor.prev_blocksize = Some(blocksize);
        self.cursor.prev_blockflag = long_window;

        tracing::trace!(
            "Audio packet {}: {} bytes, mode {}, granule {}",
            self.cursor.packet_no,
            data.len(),
            mode,
            self.cursor.granule_position
        );

        Ok(Some(self.logical(data)))
    }

    fn logical(&self, data: Vec<u8>) -> LogicalPacket {
        LogicalPacket {
            data,
            bos: false,
            eos: false,
            granule_position: self.cursor.granule_position,
            packet_no: self.cursor.packet_no,
            flush: false,
        }
    }

    fn mode_mask(&self) -> u32 {
        (1u32 << self.modes.mode_bits()) - 1
    }

    fn mode_number(&self, payload: &[u8]) -> u32 {
        let first_byte = payload[0] as u32;
        if self.mod_packets {
            first_byte & self.mode_mask()
        } else {
            (first_byte >> 1) & self.mode_mask()
        }
    }

    /// Block flag of the following packet, `Some(false)` when there is none to peek.
    fn peek_next_blockflag(&self, next: Option<&Packet>, buf: &[u8], base: u64) -> Option<bool> {
        let Some(next) = next else {
            return Some(false);
        };
        if next.size == 0 || next.next_offset() > self.data_end {
            return Some(false);
        }

        let start = next.offset.checked_sub(base)? as usize;
        let first = buf.get(start..start + 1)?;
        Some(
            self.modes
                .is_long(self.mode_number(first))
                .unwrap_or(false),
        )
    }

    fn rebuild_modified(
        &self,
        payload: &[u8],
        mode: u32,
        long_window: bool,
        next_blockflag: bool,
    ) -> WemResult<Vec<u8>> {
        let mode_bits = self.modes.mode_bits();
        let mut reader = BitReader::new(payload);
        let mut writer = BitWriter::new();

        // OUT: 1 bit packet type (0 == audio)
        writer.write_bits(0, 1)?;

        // IN/OUT: N bit mode number
        reader.seek_bits(mode_bits as i64);
        writer.write_bits(mode, mode_bits)?;

        if long_window {
            // OUT: previous/next window type bits
            writer.write_bit(self.cursor.prev_blockflag)?;
            writer.write_bit(next_blockflag)?;
        }

        // IN/OUT: remaining bits of the first byte
        let remainder = reader.read_bits(8 - mode_bits)?;
        writer.write_bits(remainder, 8 - mode_bits)?;

        writer.write_raw(&payload[1..], (payload.len() - 1) * 8)?;
        writer.into_inner()
    }
}
