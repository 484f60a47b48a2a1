//! Downstream consumers of logical packets.

use crate::error::WemResult;
use crate::vorbis::packet::LogicalPacket;
use ogg::{PacketWriteEndInfo, PacketWriter};
use std::io::Write;

/// Receives logical packets strictly in sequence order.
pub trait PacketSink {
    fn accept(&mut self, packet: LogicalPacket) -> WemResult<()>;
}

impl PacketSink for Vec<LogicalPacket> {
    fn accept(&mut self, packet: LogicalPacket) -> WemResult<()> {
        self.push(packet);
        Ok(())
    }
}

impl<S: PacketSink + ?Sized> PacketSink for &mut S {
    fn accept(&mut self, packet: LogicalPacket) -> WemResult<()> {
        (**self).accept(packet)
    }
}

/// Pages logical packets into an Ogg bitstream with the `ogg` crate.
///
/// `eos` ends the stream, `flush` closes the current page and anything else is
/// left to the page writer to batch.
pub struct OggPacketSink<'a, W: Write> {
    writer: PacketWriter<'a, W>,
    serial: u32,
    packets: u64,
}

impl<'a, W: Write> OggPacketSink<'a, W> {
    pub fn new(output: W, serial: u32) -> Self {
        Self {
            writer: PacketWriter::new(output),
            serial,
            packets: 0,
        }
    }

    /// Bitstream serial number written on every page.
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Number of packets written so far.
    pub fn packets_written(&self) -> u64 {
        self.packets
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> PacketSink for OggPacketSink<'_, W> {
    fn accept(&mut self, packet: LogicalPacket) -> WemResult<()> {
        let end_info = if packet.eos {
            PacketWriteEndInfo::EndStream
        } else if packet.flush {
            PacketWriteEndInfo::EndPage
        } else {
            PacketWriteEndInfo::NormalPacket
        };

        self.writer.write_packet(
            packet.data,
            self.serial,
            end_info,
            packet.granule_position,
        )?;
        self.packets += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(packet_no: u64, flush: bool, eos: bool) -> LogicalPacket {
        LogicalPacket {
            data: vec![packet_no as u8; 4],
            bos: packet_no == 0,
            eos,
            granule_position: packet_no * 10,
            packet_no,
            flush,
        }
    }

    #[test]
    fn test_vec_sink_keeps_order() {
        let mut sink: Vec<LogicalPacket> = Vec::new();
        for i in 0..3 {
            sink.accept(packet(i, false, false)).unwrap();
        }
        let numbers: Vec<u64> = sink.iter().map(|p| p.packet_no).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
    }

    #[test]
    fn test_ogg_sink_writes_pages() {
        let mut sink = OggPacketSink::new(Vec::new(), 0x1234);
        sink.accept(packet(0, true, false)).unwrap();
        sink.accept(packet(1, false, false)).unwrap();
        sink.accept(packet(2, true, true)).unwrap();
        assert_eq!(sink.packets_written(), 3);
        assert_eq!(sink.serial(), 0x1234);

        let bytes = sink.into_inner();
        assert_eq!(&bytes[..4], b"OggS");
        let pages = bytes.windows(4).filter(|w| *w == b"OggS").count();
        assert_eq!(pages, 2);
        // First page carries the BOS flag.
        assert_eq!(bytes[5] & 0x02, 0x02);
    }
}
