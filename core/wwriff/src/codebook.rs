//! Vorbis codebook library for rebuilding Wwise audio.
//!
//! Wwise audio files use a stripped Vorbis format that references external codebook
//! libraries instead of embedding the full codebook data. This module loads those
//! libraries and expands their packed fragments back into canonical Vorbis codebooks.
//!
//! # Library layout
//!
//! A packed library is a concatenation of codebook fragments followed by a table of
//! little-endian `u32` start offsets. The final 4 bytes hold the offset of that table.
//! Every table word counts as an entry, the last one included. That word is the
//! table offset itself, so the final entry is always an empty fragment.
//!
//! # Example
//!
//! ```no_run
//! use wwriff::{BitWriter, CodebookLibrary};
//!
//! let codebooks = CodebookLibrary::from_file("packed_codebooks_aoTuV_603.bin")?;
//! let mut writer = BitWriter::new();
//! codebooks.rebuild(0, &mut writer)?;
//! # Ok::<(), wwriff::WemError>(())
//! ```

use crate::bit_reader::{BitRead, BitReader};
use crate::bit_writer::BitWriter;
use crate::error::{WemError, WemResult};
use crate::vorbis::helpers::{book_map_type1_quantvals, ilog};
use byteorder::{ByteOrder, LittleEndian};
use std::io::Write;
use std::path::Path;

/// The canonical codebook sync pattern, "BCV" packed LSB-first.
pub const CODEBOOK_SYNC: [u8; 3] = [0x42, 0x43, 0x56];

#[derive(Clone)]
pub struct CodebookLibrary {
    data: Vec<u8>,
    offsets: Vec<usize>,
}

impl CodebookLibrary {
    /// Create an empty codebook library.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            offsets: Vec::new(),
        }
    }

    /// Load codebooks from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> WemResult<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Load codebooks from a byte slice.
    pub fn from_bytes(data: &[u8]) -> WemResult<Self> {
        if data.len() < 4 {
            return Err(WemError::codebook("codebook library too short"));
        }

        let len = data.len();
        let table_offset = LittleEndian::read_u32(&data[len - 4..]) as usize;

        if table_offset > len - 4 {
            return Err(WemError::codebook("invalid codebook library offset table"));
        }

        let table_len = len - table_offset;
        if !table_len.is_multiple_of(4) {
            return Err(WemError::codebook("invalid codebook library table size"));
        }

        let offsets = data[table_offset..]
            .chunks_exact(4)
            .map(|word| LittleEndian::read_u32(word) as usize)
            .collect::<Vec<_>>();

        if offsets.windows(2).any(|pair| pair[0] > pair[1])
            || offsets.iter().any(|&offset| offset > table_offset)
        {
            return Err(WemError::codebook("invalid codebook offset"));
        }

        Ok(Self {
            data: data[..table_offset].to_vec(),
            offsets,
        })
    }

    /// Get the number of entries in the offset table.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the library holds no codebooks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the packed fragment for a codebook.
    pub fn get(&self, id: usize) -> WemResult<&[u8]> {
        if id >= self.len() {
            return Err(WemError::invalid_codebook_id(id as u32, self.len() as u32));
        }

        let start = self.offsets[id];
        let end = self.offsets.get(id + 1).copied().unwrap_or(self.data.len());
        Ok(&self.data[start..end])
    }

    /// Get the size in bytes of a codebook's packed fragment.
    pub fn fragment_size(&self, id: usize) -> Option<usize> {
        self.get(id).ok().map(<[u8]>::len)
    }

    /// Rebuild a codebook from the library by index and write it to `output`.
    ///
    /// The fragment must be consumed exactly; any difference between the bits read
    /// (rounded up to a byte) and the stored size is a size mismatch.
    pub fn rebuild<W: Write>(&self, id: usize, output: &mut BitWriter<W>) -> WemResult<()> {
        let codebook = self.get(id)?;
        let mut reader = BitReader::new(codebook);
        rebuild_codebook(&mut reader, output).map_err(|err| match err {
            WemError::BitBounds {
                position,
                requested,
                ..
            } => WemError::size_mismatch(
                codebook.len() as u64,
                (position + requested as u64).div_ceil(8),
            ),
            other => other,
        })?;

        let bytes_read = reader.total_bits_read().div_ceil(8);
        if bytes_read != codebook.len() as u64 {
            return Err(WemError::size_mismatch(codebook.len() as u64, bytes_read));
        }
        Ok(())
    }
}

/// Rebuild one stripped codebook read from `input` into canonical form.
///
/// This is used directly for codebooks stored inline in the setup fragment, where
/// there is no per-codebook size to check against.
pub fn rebuild_codebook<B: BitRead, W: Write>(
    input: &mut B,
    output: &mut BitWriter<W>,
) -> WemResult<()> {
    // IN: 4 bit dimensions, 14 bit entry count
    let dimensions = input.read_bits(4)?;
    let entries = input.read_bits(14)?;

    // OUT: 24 bit identifier, 16 bit dimensions, 24 bit entry count
    output.write_raw(&CODEBOOK_SYNC, 24)?;
    output.write_bits(dimensions, 16)?;
    output.write_bits(entries, 24)?;

    // IN/OUT: 1 bit ordered flag
    let ordered = input.read_bits(1)?;
    output.write_bits(ordered, 1)?;

    if ordered != 0 {
        let initial_length = input.read_bits(5)?;
        output.write_bits(initial_length, 5)?;

        let mut current_entry = 0u32;
        while current_entry < entries {
            let num_bits = ilog(entries - current_entry);
            let number = input.read_bits(num_bits)?;
            output.write_bits(number, num_bits)?;
            current_entry += number;
        }

        if current_entry > entries {
            return Err(WemError::codebook("current_entry out of range"));
        }
    } else {
        // IN: 3 bit codeword length length, 1 bit sparse flag
        let codeword_length_length = input.read_bits(3)?;
        let sparse = input.read_bits(1)?;

        if codeword_length_length == 0 || codeword_length_length > 5 {
            return Err(WemError::codebook("nonsense codeword length"));
        }

        // OUT: 1 bit sparse flag
        output.write_bits(sparse, 1)?;

        for _ in 0..entries {
            let mut present = true;

            if sparse != 0 {
                let present_flag = input.read_bits(1)?;
                output.write_bits(present_flag, 1)?;
                present = present_flag != 0;
            }

            if present {
                // IN: n bit codeword length-1, OUT: 5 bit codeword length-1
                let codeword_length = input.read_bits(codeword_length_length as u8)?;
                output.write_bits(codeword_length, 5)?;
            }
        }
    }

    // IN: 1 bit lookup type, OUT: 4 bit lookup type
    let lookup_type = input.read_bits(1)?;
    output.write_bits(lookup_type, 4)?;

    if lookup_type == 1 {
        let min = input.read_bits(32)?;
        let max = input.read_bits(32)?;
        let value_length = input.read_bits(4)?;
        let sequence_flag = input.read_bits(1)?;
        output.write_bits(min, 32)?;
        output.write_bits(max, 32)?;
        output.write_bits(value_length, 4)?;
        output.write_bits(sequence_flag, 1)?;

        let quantvals = book_map_type1_quantvals(entries, dimensions);
        let width = (value_length + 1) as u8;
        for _ in 0..quantvals {
            let val = input.read_bits(width)?;
            output.write_bits(val, width)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// dimensions=1, entries=4, unordered, width=2, not sparse, lengths [1,2,3,3], lookup 0.
    fn small_fragment() -> Vec<u8> {
        let mut writer = BitWriter::new();
        writer.write_bits(1, 4).unwrap();
        writer.write_bits(4, 14).unwrap();
        writer.write_bits(0, 1).unwrap();
        writer.write_bits(2, 3).unwrap();
        writer.write_bits(0, 1).unwrap();
        for length in [1, 2, 3, 3] {
            writer.write_bits(length, 2).unwrap();
        }
        writer.write_bits(0, 1).unwrap();
        writer.into_inner().unwrap()
    }

    fn library_from(fragments: &[Vec<u8>]) -> Vec<u8> {
        let mut blob = Vec::new();
        let mut offsets = Vec::new();
        for fragment in fragments {
            offsets.push(blob.len() as u32);
            blob.extend_from_slice(fragment);
        }
        let table_offset = blob.len() as u32;
        for offset in offsets {
            blob.extend_from_slice(&offset.to_le_bytes());
        }
        blob.extend_from_slice(&table_offset.to_le_bytes());
        blob
    }

    #[test]
    fn test_empty_library() {
        let lib = CodebookLibrary::empty();
        assert_eq!(lib.len(), 0);
        assert!(lib.is_empty());
        assert!(lib.get(0).is_err());
        assert_eq!(lib.fragment_size(0), None);
    }

    #[test]
    fn test_from_bytes_too_small() {
        assert!(CodebookLibrary::from_bytes(&[0, 1, 2]).is_err());
    }

    #[test]
    fn test_from_bytes_invalid_offset() {
        let mut data = vec![0u8; 8];
        data[4] = 100;
        assert!(CodebookLibrary::from_bytes(&data).is_err());
    }

    #[test]
    fn test_from_bytes_unaligned_table() {
        let mut data = vec![0u8; 9];
        data[5] = 2;
        assert!(CodebookLibrary::from_bytes(&data).is_err());
    }

    #[test]
    fn test_library_offsets() {
        let blob = library_from(&[vec![1, 2, 3], vec![4, 5], vec![]]);
        let lib = CodebookLibrary::from_bytes(&blob).unwrap();

        // Three fragments plus the trailer word.
        assert_eq!(lib.len(), 4);
        assert_eq!(lib.get(0).unwrap(), &[1, 2, 3]);
        assert_eq!(lib.get(1).unwrap(), &[4, 5]);
        assert_eq!(lib.get(2).unwrap(), &[] as &[u8]);
        assert_eq!(lib.get(3).unwrap(), &[] as &[u8]);
        assert_eq!(lib.fragment_size(1), Some(2));
        assert!(matches!(
            lib.get(4),
            Err(WemError::InvalidCodebookId { id: 4, limit: 4 })
        ));
    }

    #[test]
    fn test_trailer_entry_is_empty() {
        let blob = library_from(&[small_fragment()]);
        let table_offset = blob.len() - 8;
        let lib = CodebookLibrary::from_bytes(&blob).unwrap();

        // (blob length - table offset) / 4
        assert_eq!(lib.len(), (blob.len() - table_offset) / 4);
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.fragment_size(1), Some(0));

        let mut writer = BitWriter::new();
        assert!(matches!(
            lib.rebuild(1, &mut writer),
            Err(WemError::SizeMismatch { expected: 0, .. })
        ));
        assert!(matches!(
            lib.get(2),
            Err(WemError::InvalidCodebookId { id: 2, limit: 2 })
        ));
    }

    #[test]
    fn test_rebuild_small_codebook() {
        let fragment = small_fragment();
        assert_eq!(fragment.len(), 4);

        let lib = CodebookLibrary::from_bytes(&library_from(&[fragment])).unwrap();
        let mut writer = BitWriter::new();
        lib.rebuild(0, &mut writer).unwrap();
        let out = writer.into_inner().unwrap();

        assert_eq!(&out[..3], &CODEBOOK_SYNC);

        let mut reader = BitReader::new(&out);
        reader.seek_bits(24);
        assert_eq!(reader.read_bits(16).unwrap(), 1);
        assert_eq!(reader.read_bits(24).unwrap(), 4);
        assert_eq!(reader.read_bits(1).unwrap(), 0); // ordered
        assert_eq!(reader.read_bits(1).unwrap(), 0); // sparse
        for length in [1, 2, 3, 3] {
            assert_eq!(reader.read_bits(5).unwrap(), length);
        }
        assert_eq!(reader.read_bits(4).unwrap(), 0); // lookup type
    }

    #[test]
    fn test_rebuild_size_mismatch() {
        let mut fragment = small_fragment();
        fragment.push(0);
        let lib = CodebookLibrary::from_bytes(&library_from(&[fragment])).unwrap();

        let mut writer = BitWriter::new();
        let result = lib.rebuild(0, &mut writer);
        assert!(matches!(
            result,
            Err(WemError::SizeMismatch {
                expected: 5,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_rebuild_nonsense_codeword_length() {
        let mut writer = BitWriter::new();
        writer.write_bits(1, 4).unwrap();
        writer.write_bits(4, 14).unwrap();
        writer.write_bits(0, 1).unwrap();
        writer.write_bits(6, 3).unwrap();
        writer.write_bits(0, 1).unwrap();
        let fragment = writer.into_inner().unwrap();

        let mut reader = BitReader::new(&fragment);
        let mut out = BitWriter::new();
        let result = rebuild_codebook(&mut reader, &mut out);
        assert!(matches!(result, Err(WemError::Codebook { .. })));
    }

    #[test]
    fn test_rebuild_ordered_with_lookup() {
        // dimensions=2, entries=9, ordered: initial length then a single run of 9.
        let mut writer = BitWriter::new();
        writer.write_bits(2, 4).unwrap();
        writer.write_bits(9, 14).unwrap();
        writer.write_bits(1, 1).unwrap();
        writer.write_bits(3, 5).unwrap();
        writer.write_bits(9, ilog(9)).unwrap();
        writer.write_bits(1, 1).unwrap(); // lookup type 1
        writer.write_bits(0x1234_5678, 32).unwrap();
        writer.write_bits(0x9ABC_DEF0, 32).unwrap();
        writer.write_bits(2, 4).unwrap(); // value length - 1
        writer.write_bits(0, 1).unwrap();
        for value in [1, 5, 7] {
            writer.write_bits(value, 3).unwrap();
        }
        let fragment = writer.into_inner().unwrap();

        let lib = CodebookLibrary::from_bytes(&library_from(&[fragment])).unwrap();
        let mut out = BitWriter::new();
        lib.rebuild(0, &mut out).unwrap();
        let bytes = out.into_inner().unwrap();

        let mut reader = BitReader::new(&bytes);
        reader.seek_bits(24 + 16 + 24);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(5).unwrap(), 3);
        assert_eq!(reader.read_bits(4).unwrap(), 9);
        assert_eq!(reader.read_bits(4).unwrap(), 1);
        assert_eq!(reader.read_bits(32).unwrap(), 0x1234_5678);
        assert_eq!(reader.read_bits(32).unwrap(), 0x9ABC_DEF0);
        assert_eq!(reader.read_bits(4).unwrap(), 2);
        assert_eq!(reader.read_bits(1).unwrap(), 0);
        for value in [1, 5, 7] {
            assert_eq!(reader.read_bits(3).unwrap(), value);
        }
    }

    #[test]
    fn test_rebuild_sparse_codebook() {
        let mut writer = BitWriter::new();
        writer.write_bits(1, 4).unwrap();
        writer.write_bits(3, 14).unwrap();
        writer.write_bits(0, 1).unwrap();
        writer.write_bits(3, 3).unwrap();
        writer.write_bits(1, 1).unwrap(); // sparse
        writer.write_bits(1, 1).unwrap();
        writer.write_bits(5, 3).unwrap();
        writer.write_bits(0, 1).unwrap();
        writer.write_bits(1, 1).unwrap();
        writer.write_bits(2, 3).unwrap();
        writer.write_bits(0, 1).unwrap(); // lookup type
        let fragment = writer.into_inner().unwrap();

        let mut reader = BitReader::new(&fragment);
        let mut out = BitWriter::new();
        rebuild_codebook(&mut reader, &mut out).unwrap();
        let bytes = out.into_inner().unwrap();

        let mut reader = BitReader::new(&bytes);
        reader.seek_bits(24 + 16 + 24 + 1);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(5).unwrap(), 5);
        assert_eq!(reader.read_bits(1).unwrap(), 0);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(5).unwrap(), 2);
    }
}
