//! wwriff: rebuilds standard Vorbis packets from Wwise RIFF/RIFX Vorbis (`.wem`) streams.
//!
//! A [`WemDecoder`] session is pushed arbitrarily split input and hands the three
//! Vorbis header packets followed by the audio packets to a [`PacketSink`].
//! [`OggPacketSink`] pages them into an Ogg file.

pub mod bit_reader;
pub mod bit_writer;
pub mod codebook;
pub mod decoder;
pub mod endian;
pub mod error;
pub mod format;
pub mod options;
pub mod scanner;
pub mod sink;
pub mod vorbis;

pub use bit_reader::*;
pub use bit_writer::*;
pub use codebook::*;
pub use decoder::*;
pub use endian::Endian;
pub use error::*;
pub use format::*;
pub use options::*;
pub use scanner::*;
pub use sink::*;
pub use vorbis::*;
