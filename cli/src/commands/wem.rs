use anyhow::{Context, Result, bail};
use clap::Subcommand;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use wwriff::{
    CodebookLibrary, ConversionOptions, ForcePacketFormat, OggPacketSink, StreamInfo, convert,
    probe,
};

#[derive(Subcommand)]
pub enum WemCommands {
    /// Decode WEM to OGG
    Decode {
        /// Input WEM file
        input: PathBuf,
        /// Output file (optional, defaults to input with .ogg extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Path to the packed codebook library
        #[arg(short, long)]
        codebooks: Option<PathBuf>,
        /// Codebooks are stored inline in the setup packet
        #[arg(long)]
        inline_codebooks: bool,
        /// Reject mode mapping indices equal to the mapping count
        #[arg(long)]
        strict_mode_mapping: bool,
        /// Treat audio packets as modified regardless of the mod signal
        #[arg(long, conflicts_with = "force_no_mod_packets")]
        force_mod_packets: bool,
        /// Treat audio packets as standard regardless of the mod signal
        #[arg(long)]
        force_no_mod_packets: bool,
        /// Bytes read from the input per push
        #[arg(long, default_value_t = 64 * 1024)]
        chunk_size: usize,
        /// Ogg bitstream serial number
        #[arg(long, default_value_t = 1)]
        serial: u32,
    },
    /// Print container and stream info
    Info {
        /// Input WEM file
        input: PathBuf,
    },
}

pub fn handle(cmd: WemCommands) -> Result<()> {
    match cmd {
        WemCommands::Decode {
            input,
            output,
            codebooks,
            inline_codebooks,
            strict_mode_mapping,
            force_mod_packets,
            force_no_mod_packets,
            chunk_size,
            serial,
        } => {
            let force_packet_format = if force_mod_packets {
                ForcePacketFormat::ForceModPackets
            } else if force_no_mod_packets {
                ForcePacketFormat::ForceNoModPackets
            } else {
                ForcePacketFormat::NoForce
            };
            let options = ConversionOptions::new()
                .with_inline_codebooks(inline_codebooks)
                .with_strict_mode_mapping(strict_mode_mapping)
                .with_force_packet_format(force_packet_format);

            wem_decode(&input, &output, codebooks.as_deref(), options, chunk_size, serial)
        }
        WemCommands::Info { input } => wem_info(&input),
    }
}

fn wem_decode(
    input: &Path,
    output: &Option<PathBuf>,
    codebooks: Option<&Path>,
    options: ConversionOptions,
    chunk_size: usize,
    serial: u32,
) -> Result<()> {
    let out_path = match output {
        Some(p) => p.clone(),
        None => input.with_extension("ogg"),
    };

    let codebooks = match codebooks {
        Some(path) => Some(Arc::new(
            CodebookLibrary::from_file(path)
                .with_context(|| format!("Failed to load codebooks from {:?}", path))?,
        )),
        None if options.inline_codebooks => None,
        None => bail!("--codebooks is required unless --inline-codebooks is set"),
    };

    info!("Decoding {:?} -> {:?}", input, out_path);

    let file = File::open(input).with_context(|| format!("Failed to open {:?}", input))?;
    let out_file =
        File::create(&out_path).with_context(|| format!("Failed to create {:?}", out_path))?;
    let mut sink = OggPacketSink::new(BufWriter::new(out_file), serial);

    let decoder = convert(
        BufReader::new(file),
        codebooks,
        options,
        &mut sink,
        chunk_size,
    )
    .with_context(|| format!("Failed to convert {:?}", input))?;

    let packets = sink.packets_written();
    sink.into_inner().flush()?;

    if let Some(stream) = decoder.info() {
        info!(
            "  {} channels, {} Hz, {} samples",
            stream.format.channels, stream.format.sample_rate, stream.vorb.sample_count
        );
    }
    info!("Wrote {} packets to {:?}", packets, out_path);
    Ok(())
}

fn wem_info(input: &Path) -> Result<()> {
    let file = File::open(input).with_context(|| format!("Failed to open {:?}", input))?;
    let stream = probe(BufReader::new(file), 4096)
        .with_context(|| format!("Failed to read {:?}", input))?;
    print_info(input, &stream);
    Ok(())
}

fn print_info(input: &Path, stream: &StreamInfo) {
    let vorb = &stream.vorb;
    println!("{:?}", input);
    println!(
        "  Container:    {:?} endian, RIFF size {:#x}",
        stream.header.endian, stream.header.riff_size
    );
    println!("  Channels:     {}", stream.format.channels);
    println!("  Sample rate:  {} Hz", stream.format.sample_rate);
    println!(
        "  Bitrate:      {} bps",
        stream.format.avg_bytes_per_second as u64 * 8
    );
    println!("  Samples:      {}", vorb.sample_count);
    println!("  Block sizes:  {} / {}", vorb.blocksize_0(), vorb.blocksize_1());
    println!(
        "  Packets:      {}",
        if vorb.mod_packets() { "modified" } else { "standard" }
    );
    println!("  Stream UID:   {:#010x}", vorb.uid);
    println!(
        "  Data chunk:   {:#x} bytes at {:#x}",
        stream.data_size, stream.data_offset
    );
    if let Some(points) = stream.loop_points {
        println!("  Loop:         {} - {}", points.start, points.end);
    }
}
