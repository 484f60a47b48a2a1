//! Setup header reconstruction.
//!
//! Wwise packs the Vorbis setup header: codebooks are replaced by 10 bit library
//! ids (or stored stripped), fixed fields such as the floor and mapping types are
//! dropped, and several widths are narrowed. Rebuilding re-reads every field,
//! validates it and writes the canonical layout.

use crate::bit_reader::{BitRead, BitReader};
use crate::bit_writer::BitWriter;
use crate::codebook::{CodebookLibrary, rebuild_codebook};
use crate::endian::Endian;
use crate::error::{WemError, WemResult};
use crate::options::ConversionOptions;
use crate::vorbis::headers::{PACKET_TYPE_SETUP, write_vorbis_packet_header};
use crate::vorbis::helpers::ilog;
use crate::vorbis::packet::Packet;
use std::io::Write;

/// Largest number of modes a setup header can declare (6 bit count).
pub const MAX_MODES: usize = 64;

/// Per-mode window sizes, fixed once the setup header has been rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTable {
    mode_bits: u8,
    count: usize,
    long_window: [bool; MAX_MODES],
}

impl ModeTable {
    pub fn from_block_flags(flags: &[bool]) -> WemResult<Self> {
        if flags.is_empty() || flags.len() > MAX_MODES {
            return Err(WemError::setup(format!("invalid mode count {}", flags.len())));
        }

        let mut long_window = [false; MAX_MODES];
        long_window[..flags.len()].copy_from_slice(flags);

        Ok(Self {
            mode_bits: ilog(flags.len() as u32 - 1),
            count: flags.len(),
            long_window,
        })
    }

    /// Width of the mode number at the start of every audio packet.
    pub fn mode_bits(&self) -> u8 {
        self.mode_bits
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether `mode` uses the long window, or `None` for an undeclared mode.
    pub fn is_long(&self, mode: u32) -> Option<bool> {
        let mode = mode as usize;
        (mode < self.count).then(|| self.long_window[mode])
    }
}

/// The rebuilt setup header together with what audio decoding needs from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupHeader {
    /// Complete setup packet: type byte, `vorbis` and the canonical body.
    pub packet: Vec<u8>,
    pub modes: ModeTable,
}

/// Counts read from the setup fragment while rebuilding it.
#[derive(Debug, Default)]
struct SetupCounts {
    codebooks: u32,
    floors: u32,
    residues: u32,
    mappings: u32,
}

/// Rebuilds the canonical setup packet from the packed fragment in the data chunk.
pub struct SetupRebuilder<'a> {
    codebooks: Option<&'a CodebookLibrary>,
    options: &'a ConversionOptions,
    endian: Endian,
    channels: u16,
    setup_packet_offset: u32,
}

impl<'a> SetupRebuilder<'a> {
    pub fn new(
        codebooks: Option<&'a CodebookLibrary>,
        options: &'a ConversionOptions,
        endian: Endian,
        channels: u16,
        setup_packet_offset: u32,
    ) -> Self {
        Self {
            codebooks,
            options,
            endian,
            channels,
            setup_packet_offset,
        }
    }

    /// Attempt the rebuild over the data chunk bytes received so far.
    ///
    /// `data` must start at the first byte of the `data` chunk. Returns `Ok(None)`
    /// while the setup fragment is not yet complete.
    pub fn try_rebuild(&self, data: &[u8]) -> WemResult<Option<SetupHeader>> {
        let Some(packet) = Packet::read(data, 0, self.setup_packet_offset as u64, self.endian)
        else {
            return Ok(None);
        };
        let Some(fragment) = packet.payload(data, 0) else {
            return Ok(None);
        };

        let mut reader = BitReader::new(fragment);
        let mut writer = BitWriter::new();
        write_vorbis_packet_header(&mut writer, PACKET_TYPE_SETUP)?;

        let expected = fragment.len() as u64;
        let (modes, counts) = self
            .rebuild_body(&mut reader, &mut writer)
            .map_err(|err| match err {
                WemError::BitBounds {
                    position,
                    requested,
                    ..
                } => WemError::SetupFraming {
                    expected,
                    actual: (position + requested as u64).div_ceil(8),
                },
                other => other,
            })?;

        let actual = reader.total_bits_read().div_ceil(8);
        if actual != expected {
            return Err(WemError::SetupFraming { expected, actual });
        }

        tracing::debug!(
            "Rebuilt setup header: {} codebooks, {} floors, {} residues, {} mappings, {} modes",
            counts.codebooks,
            counts.floors,
            counts.residues,
            counts.mappings,
            modes.len()
        );

        Ok(Some(SetupHeader {
            packet: writer.into_inner()?,
            modes,
        }))
    }

    fn rebuild_body<W: Write>(
        &self,
        reader: &mut BitReader<'_>,
        writer: &mut BitWriter<W>,
    ) -> WemResult<(ModeTable, SetupCounts)> {
        let mut counts = SetupCounts::default();

        let codebook_count_less1 = reader.read_bits(8)?;
        counts.codebooks = codebook_count_less1 + 1;
        writer.write_bits(codebook_count_less1, 8)?;

        if self.options.inline_codebooks {
            for _ in 0..counts.codebooks {
                rebuild_codebook(reader, writer)?;
            }
        } else {
            let library = self.codebooks.ok_or(WemError::MissingLibrary)?;
            for _ in 0..counts.codebooks {
                let codebook_id = reader.read_bits(10)?;
                library.rebuild(codebook_id as usize, writer)?;
            }
        }

        // Time domain transforms placeholder
        writer.write_bits(0, 6)?; // time_count_less1
        writer.write_bits(0, 16)?; // dummy_time_value

        let floor_count_less1 = reader.read_bits(6)?;
        counts.floors = floor_count_less1 + 1;
        writer.write_bits(floor_count_less1, 6)?;

        for _ in 0..counts.floors {
            writer.write_bits(1, 16)?; // floor type 1
            rebuild_floor(reader, counts.codebooks, writer)?;
        }

        let residue_count_less1 = reader.read_bits(6)?;
        counts.residues = residue_count_less1 + 1;
        writer.write_bits(residue_count_less1, 6)?;

        for _ in 0..counts.residues {
            rebuild_residue(reader, counts.codebooks, writer)?;
        }

        let mapping_count_less1 = reader.read_bits(6)?;
        counts.mappings = mapping_count_less1 + 1;
        writer.write_bits(mapping_count_less1, 6)?;

        for _ in 0..counts.mappings {
            rebuild_mapping(
                self.channels,
                reader,
                counts.floors,
                counts.residues,
                writer,
            )?;
        }

        let modes = rebuild_modes(
            reader,
            counts.mappings,
            self.options.strict_mode_mapping,
            writer,
        )?;

        writer.write_bits(1, 1)?; // framing
        Ok((modes, counts))
    }
}

fn rebuild_floor<B: BitRead, W: Write>(
    reader: &mut B,
    codebook_count: u32,
    writer: &mut BitWriter<W>,
) -> WemResult<()> {
    let floor1_partitions = reader.read_bits(5)?;
    writer.write_bits(floor1_partitions, 5)?;

    let mut floor1_partition_class_list = vec![0u32; floor1_partitions as usize];
    let mut maximum_class = 0u32;

    for partition_class in floor1_partition_class_list.iter_mut() {
        let floor1_partition_class = reader.read_bits(4)?;
        writer.write_bits(floor1_partition_class, 4)?;
        *partition_class = floor1_partition_class;
        maximum_class = maximum_class.max(floor1_partition_class);
    }

    let mut floor1_class_dimensions_list = vec![0u32; (maximum_class + 1) as usize];

    for class_dimension in floor1_class_dimensions_list.iter_mut() {
        let class_dimensions_less1 = reader.read_bits(3)?;
        writer.write_bits(class_dimensions_less1, 3)?;
        *class_dimension = class_dimensions_less1 + 1;

        let class_subclasses = reader.read_bits(2)?;
        writer.write_bits(class_subclasses, 2)?;

        if class_subclasses != 0 {
            let masterbook = reader.read_bits(8)?;
            writer.write_bits(masterbook, 8)?;

            if masterbook >= codebook_count {
                return Err(WemError::setup("invalid floor1 masterbook"));
            }
        }

        for _ in 0..(1u32 << class_subclasses) {
            let subclass_book_plus1 = reader.read_bits(8)?;
            writer.write_bits(subclass_book_plus1, 8)?;

            if subclass_book_plus1 != 0 && subclass_book_plus1 - 1 >= codebook_count {
                return Err(WemError::setup("invalid floor1 subclass book"));
            }
        }
    }

    let floor1_multiplier_less1 = reader.read_bits(2)?;
    writer.write_bits(floor1_multiplier_less1, 2)?;

    let rangebits = reader.read_bits(4)? as u8;
    writer.write_bits(rangebits as u32, 4)?;

    for &current_class_number in &floor1_partition_class_list {
        for _ in 0..floor1_class_dimensions_list[current_class_number as usize] {
            let x = reader.read_bits(rangebits)?;
            writer.write_bits(x, rangebits)?;
        }
    }

    Ok(())
}

fn rebuild_residue<B: BitRead, W: Write>(
    reader: &mut B,
    codebook_count: u32,
    writer: &mut BitWriter<W>,
) -> WemResult<()> {
    // IN: 2 bit residue type, OUT: 16 bit residue type
    let residue_type = reader.read_bits(2)?;
    writer.write_bits(residue_type, 16)?;

    if residue_type > 2 {
        return Err(WemError::setup("invalid residue type"));
    }

    let residue_begin = reader.read_bits(24)?;
    let residue_end = reader.read_bits(24)?;
    let residue_partition_size_less1 = reader.read_bits(24)?;
    let residue_classifications_less1 = reader.read_bits(6)?;
    let residue_classbook = reader.read_bits(8)?;

    writer.write_bits(residue_begin, 24)?;
    writer.write_bits(residue_end, 24)?;
    writer.write_bits(residue_partition_size_less1, 24)?;
    writer.write_bits(residue_classifications_less1, 6)?;
    writer.write_bits(residue_classbook, 8)?;

    if residue_classbook >= codebook_count {
        return Err(WemError::setup("invalid residue classbook"));
    }

    let mut residue_cascade = vec![0u32; (residue_classifications_less1 + 1) as usize];

    for cascade in residue_cascade.iter_mut() {
        let low_bits = reader.read_bits(3)?;
        writer.write_bits(low_bits, 3)?;

        let bitflag = reader.read_bits(1)?;
        writer.write_bits(bitflag, 1)?;

        let high_bits = if bitflag != 0 {
            let hb = reader.read_bits(5)?;
            writer.write_bits(hb, 5)?;
            hb
        } else {
            0
        };

        *cascade = high_bits * 8 + low_bits;
    }

    for &cascade in &residue_cascade {
        for k in 0..8 {
            if (cascade & (1 << k)) != 0 {
                let residue_book = reader.read_bits(8)?;
                writer.write_bits(residue_book, 8)?;

                if residue_book >= codebook_count {
                    return Err(WemError::setup("invalid residue book"));
                }
            }
        }
    }

    Ok(())
}

fn rebuild_mapping<B: BitRead, W: Write>(
    channels: u16,
    reader: &mut B,
    floor_count: u32,
    residue_count: u32,
    writer: &mut BitWriter<W>,
) -> WemResult<()> {
    writer.write_bits(0, 16)?; // mapping type 0

    let submaps_flag = reader.read_bits(1)?;
    writer.write_bits(submaps_flag, 1)?;

    let submaps = if submaps_flag != 0 {
        let submaps_less1 = reader.read_bits(4)?;
        writer.write_bits(submaps_less1, 4)?;
        submaps_less1 + 1
    } else {
        1
    };

    let square_polar_flag = reader.read_bits(1)?;
    writer.write_bits(square_polar_flag, 1)?;

    if square_polar_flag != 0 {
        let coupling_steps_less1 = reader.read_bits(8)?;
        writer.write_bits(coupling_steps_less1, 8)?;

        let coupling_bits = ilog(channels as u32 - 1);

        for _ in 0..=coupling_steps_less1 {
            let magnitude = reader.read_bits(coupling_bits)?;
            let angle = reader.read_bits(coupling_bits)?;
            writer.write_bits(magnitude, coupling_bits)?;
            writer.write_bits(angle, coupling_bits)?;

            if angle == magnitude || magnitude >= channels as u32 || angle >= channels as u32 {
                return Err(WemError::setup("invalid coupling"));
            }
        }
    }

    let mapping_reserved = reader.read_bits(2)?;
    writer.write_bits(mapping_reserved, 2)?;

    if mapping_reserved != 0 {
        return Err(WemError::setup("mapping reserved field nonzero"));
    }

    if submaps > 1 {
        for _ in 0..channels {
            let mapping_mux = reader.read_bits(4)?;
            writer.write_bits(mapping_mux, 4)?;

            if mapping_mux >= submaps {
                return Err(WemError::setup("mapping_mux >= submaps"));
            }
        }
    }

    for _ in 0..submaps {
        let time_config = reader.read_bits(8)?;
        writer.write_bits(time_config, 8)?;

        let floor_number = reader.read_bits(8)?;
        writer.write_bits(floor_number, 8)?;

        if floor_number >= floor_count {
            return Err(WemError::setup("invalid floor mapping"));
        }

        let residue_number = reader.read_bits(8)?;
        writer.write_bits(residue_number, 8)?;

        if residue_number >= residue_count {
            return Err(WemError::setup("invalid residue mapping"));
        }
    }

    Ok(())
}

fn rebuild_modes<B: BitRead, W: Write>(
    reader: &mut B,
    mapping_count: u32,
    strict_mapping: bool,
    writer: &mut BitWriter<W>,
) -> WemResult<ModeTable> {
    let mode_count_less1 = reader.read_bits(6)?;
    writer.write_bits(mode_count_less1, 6)?;

    let mut block_flags = Vec::with_capacity(mode_count_less1 as usize + 1);

    for _ in 0..=mode_count_less1 {
        let block_flag = reader.read_bits(1)?;
        writer.write_bits(block_flag, 1)?;
        block_flags.push(block_flag != 0);

        writer.write_bits(0, 16)?; // windowtype
        writer.write_bits(0, 16)?; // transformtype

        let mapping = reader.read_bits(8)?;
        writer.write_bits(mapping, 8)?;

        // Lenient by default: mapping == mapping_count is let through.
        let out_of_range = if strict_mapping {
            mapping >= mapping_count
        } else {
            mapping > mapping_count
        };
        if out_of_range {
            return Err(WemError::setup("invalid mode mapping"));
        }
    }

    ModeTable::from_block_flags(&block_flags)
}
