//! Vorbis identification and comment headers.
//!
//! Wwise strips both headers; everything they carry is recovered from the
//! `fmt ` chunk, the vorb extension and the optional `smpl` loop points.

use crate::bit_writer::BitWriter;
use crate::error::WemResult;
use crate::format::{FormatInfo, VorbInfo};
use std::io::Write;

const VORBIS_BYTES: &[u8] = b"vorbis";

/// Vorbis header packet types.
pub const PACKET_TYPE_IDENTIFICATION: u8 = 1;
pub const PACKET_TYPE_COMMENT: u8 = 3;
pub const PACKET_TYPE_SETUP: u8 = 5;

/// Vendor string written into the comment header.
pub fn vendor_string() -> String {
    format!(
        "converted from Audiokinetic Wwise by wwriff {}",
        env!("CARGO_PKG_VERSION")
    )
}

/// Write the packet type byte followed by the `vorbis` signature.
pub fn write_vorbis_packet_header<W: Write>(
    writer: &mut BitWriter<W>,
    packet_type: u8,
) -> WemResult<()> {
    writer.write_bits(packet_type as u32, 8)?;
    writer.write_raw(VORBIS_BYTES, VORBIS_BYTES.len() * 8)
}

fn write_length_prefixed<W: Write>(writer: &mut BitWriter<W>, text: &str) -> WemResult<()> {
    writer.write_bits(text.len() as u32, 32)?;
    writer.write_raw(text.as_bytes(), text.len() * 8)
}

/// Build the identification header (packet 0).
pub fn identification_packet(format: &FormatInfo, vorb: &VorbInfo) -> WemResult<Vec<u8>> {
    let mut writer = BitWriter::new();
    write_vorbis_packet_header(&mut writer, PACKET_TYPE_IDENTIFICATION)?;
    writer.write_bits(0, 32)?; // version
    writer.write_bits(format.channels as u32, 8)?;
    writer.write_bits(format.sample_rate, 32)?;
    writer.write_bits(0, 32)?; // bitrate_max
    writer.write_bits(format.avg_bytes_per_second.wrapping_mul(8), 32)?; // bitrate_nominal
    writer.write_bits(0, 32)?; // bitrate_minimum
    writer.write_bits(vorb.blocksize_0_pow as u32, 4)?;
    writer.write_bits(vorb.blocksize_1_pow as u32, 4)?;
    writer.write_bits(1, 1)?; // framing
    writer.into_inner()
}

/// Build the comment header (packet 1), with loop points as user comments.
pub fn comment_packet(loop_range: Option<(u32, u32)>) -> WemResult<Vec<u8>> {
    let mut writer = BitWriter::new();
    write_vorbis_packet_header(&mut writer, PACKET_TYPE_COMMENT)?;
    write_length_prefixed(&mut writer, &vendor_string())?;

    match loop_range {
        None => writer.write_bits(0, 32)?,
        Some((start, end)) => {
            writer.write_bits(2, 32)?;
            write_length_prefixed(&mut writer, &format!("LoopStart={}", start))?;
            write_length_prefixed(&mut writer, &format!("LoopEnd={}", end))?;
        }
    }

    writer.write_bits(1, 1)?; // framing
    writer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{ByteOrder, LittleEndian};

    fn format() -> (FormatInfo, VorbInfo) {
        let vorb = VorbInfo {
            sample_count: 1000,
            mod_signal: 0,
            setup_packet_offset: 0,
            first_audio_packet_offset: 0,
            uid: 0,
            blocksize_0_pow: 8,
            blocksize_1_pow: 11,
        };
        let format = FormatInfo {
            channels: 2,
            sample_rate: 44100,
            avg_bytes_per_second: 12000,
            subtype: 0,
            vorb: Some(vorb),
        };
        (format, vorb)
    }

    #[test]
    fn test_identification_layout() {
        let (format, vorb) = format();
        let packet = identification_packet(&format, &vorb).unwrap();

        assert_eq!(packet.len(), 30);
        assert_eq!(packet[0], 1);
        assert_eq!(&packet[1..7], b"vorbis");
        assert_eq!(LittleEndian::read_u32(&packet[7..]), 0);
        assert_eq!(packet[11], 2);
        assert_eq!(LittleEndian::read_u32(&packet[12..]), 44100);
        assert_eq!(LittleEndian::read_u32(&packet[20..]), 96000);
        assert_eq!(packet[28], (11 << 4) | 8);
        assert_eq!(packet[29], 1);
    }

    #[test]
    fn test_comment_without_loops() {
        let packet = comment_packet(None).unwrap();
        let vendor = vendor_string();

        assert_eq!(packet[0], 3);
        assert_eq!(&packet[1..7], b"vorbis");
        assert_eq!(LittleEndian::read_u32(&packet[7..]) as usize, vendor.len());
        assert_eq!(&packet[11..11 + vendor.len()], vendor.as_bytes());
        let rest = &packet[11 + vendor.len()..];
        assert_eq!(rest, &[0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_comment_with_loops() {
        let packet = comment_packet(Some((10, 500))).unwrap();
        let vendor = vendor_string();
        let rest = &packet[11 + vendor.len()..];

        assert_eq!(LittleEndian::read_u32(rest), 2);
        assert_eq!(LittleEndian::read_u32(&rest[4..]), 12);
        assert_eq!(&rest[8..20], b"LoopStart=10");
        assert_eq!(LittleEndian::read_u32(&rest[20..]), 11);
        assert_eq!(&rest[24..35], b"LoopEnd=500");
        assert_eq!(rest[35], 1);
    }
}
