//! Synthetic codebook libraries, setup fragments and WEM files.

#![allow(dead_code)]

use wwriff::{BitWriter, LogicalPacket, PacketSink, WemDecoder, WemResult};

pub const SAMPLE_RATE: u32 = 44100;
pub const BLOCKSIZE_0_POW: u8 = 8;
pub const BLOCKSIZE_1_POW: u8 = 11;

fn write_small_codebook(writer: &mut BitWriter) {
    // dimensions=1, entries=4, unordered, width 2, not sparse, lengths [1,2,3,3], lookup 0
    writer.write_bits(1, 4).unwrap();
    writer.write_bits(4, 14).unwrap();
    writer.write_bits(0, 1).unwrap();
    writer.write_bits(2, 3).unwrap();
    writer.write_bits(0, 1).unwrap();
    for length in [1, 2, 3, 3] {
        writer.write_bits(length, 2).unwrap();
    }
    writer.write_bits(0, 1).unwrap();
}

/// The packed 4 byte codebook used by every synthetic stream.
pub fn small_codebook() -> Vec<u8> {
    let mut writer = BitWriter::new();
    write_small_codebook(&mut writer);
    writer.into_inner().unwrap()
}

/// Pack fragments into the library layout: blobs, offset table, table offset.
pub fn library_bytes(fragments: &[Vec<u8>]) -> Vec<u8> {
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

/// A packed setup fragment and where its mode count field sits.
pub struct SetupFragment {
    pub bytes: Vec<u8>,
    /// Bit offset of the 6 bit `mode_count - 1` field.
    pub mode_count_bit: u64,
}

/// Setup fragment for two channels with one floor, residue and mapping and two
/// modes (short, long).
pub fn setup_fragment(inline_codebooks: bool, mode_mapping: u32) -> SetupFragment {
    let mut writer = BitWriter::new();

    writer.write_bits(0, 8).unwrap(); // codebook_count - 1
    if inline_codebooks {
        write_small_codebook(&mut writer);
    } else {
        writer.write_bits(0, 10).unwrap();
    }

    // floor
    writer.write_bits(0, 6).unwrap();
    writer.write_bits(1, 5).unwrap(); // partitions
    writer.write_bits(0, 4).unwrap(); // class
    writer.write_bits(0, 3).unwrap(); // dimensions - 1
    writer.write_bits(0, 2).unwrap(); // subclasses
    writer.write_bits(1, 8).unwrap(); // subclass book + 1
    writer.write_bits(1, 2).unwrap(); // multiplier - 1
    writer.write_bits(4, 4).unwrap(); // rangebits
    writer.write_bits(9, 4).unwrap();

    // residue
    writer.write_bits(0, 6).unwrap();
    writer.write_bits(1, 2).unwrap(); // type
    writer.write_bits(0, 24).unwrap();
    writer.write_bits(128, 24).unwrap();
    writer.write_bits(31, 24).unwrap();
    writer.write_bits(0, 6).unwrap(); // classifications - 1
    writer.write_bits(0, 8).unwrap(); // classbook
    writer.write_bits(1, 3).unwrap(); // cascade low bits
    writer.write_bits(0, 1).unwrap();
    writer.write_bits(0, 8).unwrap(); // book for cascade bit 0

    // mapping
    writer.write_bits(0, 6).unwrap();
    writer.write_bits(0, 1).unwrap(); // submaps flag
    writer.write_bits(1, 1).unwrap(); // square polar
    writer.write_bits(0, 8).unwrap(); // coupling steps - 1
    writer.write_bits(0, 1).unwrap(); // magnitude
    writer.write_bits(1, 1).unwrap(); // angle
    writer.write_bits(0, 2).unwrap(); // reserved
    writer.write_bits(0, 8).unwrap(); // time config
    writer.write_bits(0, 8).unwrap(); // floor
    writer.write_bits(0, 8).unwrap(); // residue

    // modes
    let mode_count_bit = writer.total_bits();
    writer.write_bits(1, 6).unwrap();
    writer.write_bits(0, 1).unwrap();
    writer.write_bits(0, 8).unwrap();
    writer.write_bits(1, 1).unwrap();
    writer.write_bits(mode_mapping, 8).unwrap();

    SetupFragment {
        bytes: writer.into_inner().unwrap(),
        mode_count_bit,
    }
}

/// Audio payloads in the modified layout: bit 0 of the first byte is the mode.
pub fn audio_packets() -> Vec<Vec<u8>> {
    vec![
        vec![0x00, 0x01, 0x02],
        vec![0x01, 0x03],
        vec![0x01, 0x04, 0x05, 0x06],
        vec![0x00],
        vec![0x01, 0x07],
        vec![0x00, 0x08, 0x09],
    ]
}

/// Builds a complete WEM file around a setup fragment and audio payloads.
#[derive(Clone)]
pub struct WemBuilder {
    pub big_endian: bool,
    pub channels: u16,
    pub mod_signal: u32,
    pub sample_count: u32,
    pub setup: Vec<u8>,
    pub audio: Vec<Vec<u8>>,
    pub junk_chunk: bool,
    pub loop_points: Option<(u32, u32)>,
    pub trailing: Vec<u8>,
}

impl WemBuilder {
    pub fn new(setup: Vec<u8>) -> Self {
        Self {
            big_endian: false,
            channels: 2,
            mod_signal: 0,
            sample_count: 10_000,
            setup,
            audio: audio_packets(),
            junk_chunk: true,
            loop_points: None,
            trailing: Vec::new(),
        }
    }

    fn u16_bytes(&self, value: u16) -> [u8; 2] {
        if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        }
    }

    fn u32_bytes(&self, value: u32) -> [u8; 4] {
        if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        }
    }

    fn chunk(&self, tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend_from_slice(&self.u32_bytes(body.len() as u32));
        out.extend_from_slice(body);
        out
    }

    fn data_body(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&self.u16_bytes(self.setup.len() as u16));
        data.extend_from_slice(&self.setup);
        for packet in &self.audio {
            data.extend_from_slice(&self.u16_bytes(packet.len() as u16));
            data.extend_from_slice(packet);
        }
        data
    }

    fn fmt_body(&self) -> Vec<u8> {
        let mut fmt = vec![0u8; 0x42];
        fmt[0x00..0x02].copy_from_slice(&self.u16_bytes(0xFFFF));
        fmt[0x02..0x04].copy_from_slice(&self.u16_bytes(self.channels));
        fmt[0x04..0x08].copy_from_slice(&self.u32_bytes(SAMPLE_RATE));
        fmt[0x08..0x0C].copy_from_slice(&self.u32_bytes(16_000));
        fmt[0x10..0x12].copy_from_slice(&self.u16_bytes(0x30));

        let vorb = 0x18;
        let first_audio = 2 + self.setup.len() as u32;
        fmt[vorb..vorb + 4].copy_from_slice(&self.u32_bytes(self.sample_count));
        fmt[vorb + 0x04..vorb + 0x08].copy_from_slice(&self.u32_bytes(self.mod_signal));
        fmt[vorb + 0x10..vorb + 0x14].copy_from_slice(&self.u32_bytes(0));
        fmt[vorb + 0x14..vorb + 0x18].copy_from_slice(&self.u32_bytes(first_audio));
        fmt[vorb + 0x24..vorb + 0x28].copy_from_slice(&self.u32_bytes(0x1234_5678));
        fmt[vorb + 0x28] = BLOCKSIZE_0_POW;
        fmt[vorb + 0x29] = BLOCKSIZE_1_POW;
        fmt
    }

    fn smpl_body(&self, start: u32, end: u32) -> Vec<u8> {
        let mut smpl = vec![0u8; 0x3C];
        smpl[0x1C..0x20].copy_from_slice(&self.u32_bytes(1));
        smpl[0x2C..0x30].copy_from_slice(&self.u32_bytes(start));
        smpl[0x30..0x34].copy_from_slice(&self.u32_bytes(end));
        smpl
    }

    pub fn build(&self) -> Vec<u8> {
        let mut chunks = self.chunk(b"fmt ", &self.fmt_body());
        if self.junk_chunk {
            chunks.extend(self.chunk(b"JUNK", &[0x5A; 13]));
        }
        if let Some((start, end)) = self.loop_points {
            chunks.extend(self.chunk(b"smpl", &self.smpl_body(start, end)));
        }
        chunks.extend(self.chunk(b"data", &self.data_body()));

        let mut out = if self.big_endian {
            b"RIFX".to_vec()
        } else {
            b"RIFF".to_vec()
        };
        out.extend_from_slice(&self.u32_bytes(chunks.len() as u32 + 4));
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(&chunks);
        out.extend_from_slice(&self.trailing);
        out
    }
}

/// Push `bytes` in pieces of `chunk_size`, then finish the session.
pub fn decode_split(
    decoder: &mut WemDecoder,
    bytes: &[u8],
    chunk_size: usize,
) -> WemResult<Vec<LogicalPacket>> {
    let mut packets: Vec<LogicalPacket> = Vec::new();
    for piece in bytes.chunks(chunk_size) {
        decoder.push(piece, &mut packets)?;
    }
    decoder.finish()?;
    Ok(packets)
}

/// Collects packets and counts how many arrived, for error-path tests.
#[derive(Default)]
pub struct CountingSink {
    pub packets: Vec<LogicalPacket>,
}

impl PacketSink for CountingSink {
    fn accept(&mut self, packet: LogicalPacket) -> WemResult<()> {
        self.packets.push(packet);
        Ok(())
    }
}
