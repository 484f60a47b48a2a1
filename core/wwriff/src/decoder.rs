//! Push-driven decode session turning a Wwise RIFF Vorbis stream into logical
//! Vorbis packets.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wwriff::{CodebookLibrary, ConversionOptions, LogicalPacket, WemDecoder};
//!
//! let codebooks = Arc::new(CodebookLibrary::from_file("packed_codebooks_aoTuV_603.bin")?);
//! let mut decoder = WemDecoder::with_codebooks(codebooks, ConversionOptions::default());
//! let mut packets: Vec<LogicalPacket> = Vec::new();
//!
//! for chunk in std::fs::read("input.wem")?.chunks(4096) {
//!     decoder.push(chunk, &mut packets)?;
//! }
//! decoder.finish()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::codebook::CodebookLibrary;
use crate::error::{WemError, WemResult};
use crate::options::ConversionOptions;
use crate::scanner::{ChunkScanner, StreamInfo};
use crate::sink::PacketSink;
use crate::vorbis::headers::{comment_packet, identification_packet};
use crate::vorbis::packet::LogicalPacket;
use crate::vorbis::packetizer::AudioPacketizer;
use crate::vorbis::setup::SetupRebuilder;
use std::io::Read;
use std::sync::Arc;

/// Decode session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Waiting for the 12 byte container header.
    Init,
    /// Walking chunk headers until the `data` chunk.
    ScanChunks,
    /// Inside the `data` chunk.
    Streaming,
    /// The end of stream packet has been emitted.
    Done,
    /// A fatal error was raised; the session accepts no more input.
    Error,
}

/// Position inside the `data` chunk.
struct DataStream {
    info: StreamInfo,
    /// Buffered data chunk bytes starting at `buffer_base`.
    buffer: Vec<u8>,
    buffer_base: u64,
    received: u64,
    packetizer: Option<AudioPacketizer>,
    trailing_warned: bool,
}

/// A single decode session.
pub struct WemDecoder {
    options: ConversionOptions,
    codebooks: Option<Arc<CodebookLibrary>>,
    state: DecoderState,
    scanner: ChunkScanner,
    stream: Option<DataStream>,
}

impl WemDecoder {
    /// Create a session without a codebook library.
    ///
    /// Unless `options.inline_codebooks` is set, a library must be installed with
    /// [`set_codebooks`](Self::set_codebooks) before the first push.
    pub fn new(options: ConversionOptions) -> Self {
        Self {
            options,
            codebooks: None,
            state: DecoderState::Init,
            scanner: ChunkScanner::new(),
            stream: None,
        }
    }

    pub fn with_codebooks(codebooks: Arc<CodebookLibrary>, options: ConversionOptions) -> Self {
        let mut decoder = Self::new(options);
        decoder.codebooks = Some(codebooks);
        decoder
    }

    pub fn set_codebooks(&mut self, codebooks: Arc<CodebookLibrary>) {
        self.codebooks = Some(codebooks);
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Stream description, available once the `data` chunk has been reached.
    pub fn info(&self) -> Option<&StreamInfo> {
        self.stream.as_ref().map(|stream| &stream.info)
    }

    /// Feed the next piece of input, emitting every packet it completes.
    ///
    /// Input may be split anywhere. Bytes after the declared end of the `data`
    /// chunk are ignored.
    pub fn push<S: PacketSink + ?Sized>(&mut self, input: &[u8], sink: &mut S) -> WemResult<()> {
        match self.state {
            DecoderState::Error => return Err(WemError::SessionFailed),
            DecoderState::Done => {
                if !input.is_empty() {
                    tracing::warn!("Ignoring {} bytes after the end of stream", input.len());
                }
                return Ok(());
            }
            _ => {}
        }

        if self.codebooks.is_none() && !self.options.inline_codebooks {
            self.state = DecoderState::Error;
            return Err(WemError::MissingLibrary);
        }

        let result = self.process(input, sink);
        if result.is_err() {
            self.state = DecoderState::Error;
        }
        result
    }

    /// End the session, failing if the stream stopped before its last packet.
    pub fn finish(&mut self) -> WemResult<()> {
        let message = match self.state {
            DecoderState::Done => return Ok(()),
            DecoderState::Error => return Err(WemError::SessionFailed),
            DecoderState::Init => "no container header".to_string(),
            DecoderState::ScanChunks => "no data chunk".to_string(),
            DecoderState::Streaming => match &self.stream {
                Some(stream) if stream.packetizer.is_none() => format!(
                    "setup packet incomplete after {} of {} data bytes",
                    stream.received, stream.info.data_size
                ),
                Some(stream) => format!(
                    "received {} of {} data bytes",
                    stream.received, stream.info.data_size
                ),
                None => "no data chunk".to_string(),
            },
        };

        self.state = DecoderState::Error;
        Err(WemError::incomplete(message))
    }

    fn process<S: PacketSink + ?Sized>(&mut self, input: &[u8], sink: &mut S) -> WemResult<()> {
        if self.state == DecoderState::Streaming {
            return self.feed_data(input, sink);
        }

        let Some((info, rest)) = self.scanner.push(input)? else {
            if self.scanner.header().is_some() {
                self.state = DecoderState::ScanChunks;
            }
            return Ok(());
        };

        self.stream = Some(DataStream {
            info,
            buffer: Vec::new(),
            buffer_base: 0,
            received: 0,
            packetizer: None,
            trailing_warned: false,
        });
        self.state = DecoderState::Streaming;
        self.feed_data(&rest, sink)
    }

    fn feed_data<S: PacketSink + ?Sized>(&mut self, input: &[u8], sink: &mut S) -> WemResult<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(WemError::parse("no data chunk"));
        };

        let room = stream.info.data_size as u64 - stream.received;
        let take = (input.len() as u64).min(room) as usize;
        if take < input.len() && !stream.trailing_warned {
            tracing::warn!("Ignoring bytes after the end of the data chunk");
            stream.trailing_warned = true;
        }
        stream.buffer.extend_from_slice(&input[..take]);
        stream.received += take as u64;

        if stream.packetizer.is_none() {
            let rebuilder = SetupRebuilder::new(
                self.codebooks.as_deref(),
                &self.options,
                stream.info.endian(),
                stream.info.format.channels,
                stream.info.vorb.setup_packet_offset,
            );
            let Some(setup) = rebuilder.try_rebuild(&stream.buffer)? else {
                if stream.received == stream.info.data_size as u64 {
                    return Err(WemError::parse("setup packet extends past the data chunk"));
                }
                return Ok(());
            };

            let info = &stream.info;
            let loop_range = match info.loop_points {
                Some(points) => Some(points.resolve(info.vorb.sample_count)?),
                None => None,
            };
            let headers = [
                identification_packet(&info.format, &info.vorb)?,
                comment_packet(loop_range)?,
                setup.packet,
            ];
            for (packet_no, data) in headers.into_iter().enumerate() {
                sink.accept(LogicalPacket {
                    data,
                    bos: packet_no == 0,
                    eos: false,
                    granule_position: 0,
                    packet_no: packet_no as u64,
                    flush: true,
                })?;
            }

            let mod_packets = self
                .options
                .force_packet_format
                .resolve(info.vorb.mod_packets());
            tracing::debug!(
                "Audio packets start at {:#x} ({} layout)",
                info.vorb.first_audio_packet_offset,
                if mod_packets { "modified" } else { "standard" }
            );
            stream.packetizer = Some(AudioPacketizer::new(
                setup.modes,
                &info.vorb,
                info.endian(),
                mod_packets,
                info.data_size as u64,
            ));
        }

        let Some(packetizer) = stream.packetizer.as_mut() else {
            return Ok(());
        };
        packetizer.drain(&stream.buffer, stream.buffer_base, sink)?;

        let done = (packetizer.cursor().offset - stream.buffer_base).min(stream.buffer.len() as u64);
        stream.buffer.drain(..done as usize);
        stream.buffer_base += done;

        if packetizer.is_finished() {
            tracing::debug!(
                "Stream complete: {} packets, final granule {}",
                packetizer.cursor().packet_no,
                packetizer.cursor().granule_position
            );
            self.state = DecoderState::Done;
        }
        Ok(())
    }
}

/// Pump `reader` through a fresh session in `chunk_size` pieces and finish it.
pub fn convert<R: Read, S: PacketSink + ?Sized>(
    mut reader: R,
    codebooks: Option<Arc<CodebookLibrary>>,
    options: ConversionOptions,
    sink: &mut S,
    chunk_size: usize,
) -> WemResult<WemDecoder> {
    let mut decoder = WemDecoder::new(options);
    if let Some(codebooks) = codebooks {
        decoder.set_codebooks(codebooks);
    }

    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        decoder.push(&buffer[..n], sink)?;
    }

    decoder.finish()?;
    Ok(decoder)
}
