//! Per-session decode configuration.

/// Audio packet layout selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForcePacketFormat {
    /// Use the layout implied by the vorb mod signal.
    #[default]
    NoForce,
    /// Always rebuild packets from the modified layout.
    ForceModPackets,
    /// Always copy packets as standard Vorbis.
    ForceNoModPackets,
}

impl ForcePacketFormat {
    /// Whether packets are modified, given what the mod signal says.
    pub fn resolve(self, detected_mod_packets: bool) -> bool {
        match self {
            ForcePacketFormat::NoForce => detected_mod_packets,
            ForcePacketFormat::ForceModPackets => true,
            ForcePacketFormat::ForceNoModPackets => false,
        }
    }
}

/// Options for one [`WemDecoder`](crate::WemDecoder) session.
///
/// # Example
///
/// ```
/// use wwriff::{ConversionOptions, ForcePacketFormat};
///
/// let options = ConversionOptions::default()
///     .with_inline_codebooks(true)
///     .with_force_packet_format(ForcePacketFormat::ForceModPackets);
/// assert!(options.inline_codebooks);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConversionOptions {
    /// If true, codebooks are stored stripped inside the setup fragment rather than
    /// referenced by id from an external codebook library.
    pub inline_codebooks: bool,

    /// Overrides the detected audio packet layout.
    pub force_packet_format: ForcePacketFormat,

    /// Reject a mode whose mapping index equals the mapping count.
    ///
    /// Off by default, which lets `mapping == count` through.
    pub strict_mode_mapping: bool,
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read codebooks from the setup fragment instead of the library.
    pub fn with_inline_codebooks(mut self, value: bool) -> Self {
        self.inline_codebooks = value;
        self
    }

    pub fn with_force_packet_format(mut self, format: ForcePacketFormat) -> Self {
        self.force_packet_format = format;
        self
    }

    pub fn with_strict_mode_mapping(mut self, value: bool) -> Self {
        self.strict_mode_mapping = value;
        self
    }
}
