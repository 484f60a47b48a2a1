//! Bit-level writer for Vorbis data.
//!
//! Packs bits LSB-first into an internal buffer and hands completed byte ranges
//! to a downstream [`Write`] sink whenever the buffer fills or on flush/end.

use crate::error::{WemError, WemResult};
use std::io::Write;

/// Size of the internal byte buffer before it is emitted to the sink.
pub const BUFFER_SIZE: usize = 1024;

/// Largest boundary accepted by [`BitWriter::align`].
pub const MAX_ALIGN: usize = 32;

pub struct BitWriter<W: Write = Vec<u8>> {
    sink: W,
    closed: bool,
    buffer: Vec<u8>,
    bit_buffer: u8,
    bits_stored: u8,
    total_bits: u64,
}

impl Default for BitWriter<Vec<u8>> {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWriter<Vec<u8>> {
    /// Create a writer that collects its output in memory.
    pub fn new() -> Self {
        Self::with_sink(Vec::new())
    }
}

impl<W: Write> BitWriter<W> {
    /// Create a writer that emits completed bytes to `sink`.
    pub fn with_sink(sink: W) -> Self {
        Self {
            sink,
            closed: false,
            buffer: Vec::with_capacity(BUFFER_SIZE),
            bit_buffer: 0,
            bits_stored: 0,
            total_bits: 0,
        }
    }

    /// Total number of bits written so far, including padding.
    pub fn total_bits(&self) -> u64 {
        self.total_bits
    }

    /// Whether [`end`](Self::end) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> WemResult<()> {
        if self.closed {
            return Err(WemError::WriterClosed);
        }
        Ok(())
    }

    fn push_byte(&mut self, byte: u8) -> WemResult<()> {
        self.buffer.push(byte);
        if self.buffer.len() == BUFFER_SIZE {
            self.emit()?;
        }
        Ok(())
    }

    fn emit(&mut self) -> WemResult<()> {
        if !self.buffer.is_empty() {
            self.sink.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    /// Write a single bit.
    pub fn write_bit(&mut self, bit: bool) -> WemResult<()> {
        self.write_bits(bit as u32, 1)
    }

    /// Write the low `count` bits of `value` (up to 32), LSB first.
    pub fn write_bits(&mut self, value: u32, count: u8) -> WemResult<()> {
        self.ensure_open()?;
        if count > 32 {
            return Err(WemError::parse("Cannot write more than 32 bits at once"));
        }

        let mut value = value as u64 & ((1u64 << count) - 1);
        let mut remaining = count;
        while remaining > 0 {
            let room = 8 - self.bits_stored;
            let take = room.min(remaining);
            let chunk = (value & ((1u64 << take) - 1)) as u8;
            self.bit_buffer |= chunk << self.bits_stored;
            self.bits_stored += take;
            value >>= take;
            remaining -= take;

            if self.bits_stored == 8 {
                let byte = self.bit_buffer;
                self.bit_buffer = 0;
                self.bits_stored = 0;
                self.push_byte(byte)?;
            }
        }

        self.total_bits += count as u64;
        Ok(())
    }

    /// Append `length` bits of already packed data, taken LSB-first from `bytes`.
    pub fn write_raw(&mut self, bytes: &[u8], length: usize) -> WemResult<()> {
        self.ensure_open()?;
        if bytes.len() * 8 < length {
            return Err(WemError::parse(format!(
                "{} bits expected, but {} passed",
                length,
                bytes.len() * 8
            )));
        }

        let whole = length / 8;
        if self.bits_stored == 0 {
            for &byte in &bytes[..whole] {
                self.push_byte(byte)?;
            }
            self.total_bits += whole as u64 * 8;
        } else {
            for &byte in &bytes[..whole] {
                self.write_bits(byte as u32, 8)?;
            }
        }

        let rest = (length % 8) as u8;
        if rest > 0 {
            self.write_bits(bytes[whole] as u32, rest)?;
        }
        Ok(())
    }

    /// Pad with zero bits up to the next multiple of `boundary` bytes.
    pub fn align(&mut self, boundary: usize) -> WemResult<()> {
        self.ensure_open()?;
        let boundary = boundary.max(1);
        if boundary > MAX_ALIGN {
            return Err(WemError::parse(format!(
                "Maximum boundary align size is {}",
                MAX_ALIGN
            )));
        }

        let valid = (self.total_bits % (boundary as u64 * 8)) as usize;
        if valid > 0 {
            self.write_raw(&[0u8; MAX_ALIGN], boundary * 8 - valid)?;
        }
        Ok(())
    }

    /// Emit all completed bytes to the sink. A trailing partial byte is kept.
    pub fn flush(&mut self) -> WemResult<()> {
        self.ensure_open()?;
        self.emit()?;
        self.sink.flush()?;
        Ok(())
    }

    /// Zero-pad the final partial byte, flush everything and close the writer.
    pub fn end(&mut self) -> WemResult<()> {
        self.align(1)?;
        self.flush()?;
        self.closed = true;
        Ok(())
    }

    /// End the writer (if still open) and return the sink.
    pub fn into_inner(mut self) -> WemResult<W> {
        if !self.closed {
            self.end()?;
        }
        Ok(self.sink)
    }
}
