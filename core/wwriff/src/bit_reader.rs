//! Bit-level reader for Vorbis data.
//!
//! Reads bits LSB-first: bit 0 of byte 0 is consumed first and becomes the
//! least significant bit of the returned value.

use crate::error::{WemError, WemResult};

/// Trait for reading bits from a source.
pub trait BitRead {
    /// Read a single bit.
    fn read_bit(&mut self) -> WemResult<bool>;

    /// Get the total number of bits read so far.
    fn total_bits_read(&self) -> u64;

    /// Read multiple bits (up to 32) and return as u32.
    fn read_bits(&mut self, count: u8) -> WemResult<u32> {
        if count > 32 {
            return Err(WemError::parse("Cannot read more than 32 bits at once"));
        }

        let mut result = 0u32;
        for i in 0..count {
            if self.read_bit()? {
                result |= 1u32 << i;
            }
        }

        Ok(result)
    }
}

/// Cursor over an immutable byte slice with bit granularity.
///
/// Seeking moves the cursor without counting toward [`total_bits_read`](Self::total_bits_read),
/// which only tracks bits actually consumed by reads.
pub struct BitReader<'a> {
    data: &'a [u8],
    position: u64,
    bits_read: u64,
}

impl<'a> BitReader<'a> {
    /// Create a new BitReader positioned at the first bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            bits_read: 0,
        }
    }

    fn bit_len(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    /// Current cursor position in bits.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Get the total number of bits consumed by reads so far.
    pub fn total_bits_read(&self) -> u64 {
        self.bits_read
    }

    /// Move the cursor by `bits`, clamping to the buffer bounds.
    pub fn seek_bits(&mut self, bits: i64) {
        let target = self.position as i64 + bits;
        self.position = target.clamp(0, self.bit_len() as i64) as u64;
    }

    /// Place the cursor on the first bit of byte `byte`, clamping to the buffer end.
    pub fn seek_to_byte(&mut self, byte: usize) {
        self.position = (byte as u64 * 8).min(self.bit_len());
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> WemResult<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Read `count` bits (up to 32) and return them as u32.
    ///
    /// Fails without moving the cursor if the read would run past the buffer.
    pub fn read_bits(&mut self, count: u8) -> WemResult<u32> {
        if count > 32 {
            return Err(WemError::parse("Cannot read more than 32 bits at once"));
        }
        if self.position + count as u64 > self.bit_len() {
            return Err(WemError::BitBounds {
                position: self.position,
                requested: count as u32,
                available: self.bit_len(),
            });
        }

        let mut result = 0u32;
        let mut filled = 0u8;
        while filled < count {
            let byte = self.data[(self.position / 8) as usize];
            let shift = (self.position % 8) as u8;
            let take = (8 - shift).min(count - filled);
            let bits = (byte >> shift) as u32 & ((1u32 << take) - 1);
            result |= bits << filled;
            filled += take;
            self.position += take as u64;
        }

        self.bits_read += count as u64;
        Ok(result)
    }
}

impl BitRead for BitReader<'_> {
    fn read_bit(&mut self) -> WemResult<bool> {
        BitReader::read_bit(self)
    }

    fn read_bits(&mut self, count: u8) -> WemResult<u32> {
        BitReader::read_bits(self, count)
    }

    fn total_bits_read(&self) -> u64 {
        BitReader::total_bits_read(self)
    }
}
