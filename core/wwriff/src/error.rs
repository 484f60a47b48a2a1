//! Error types for Wwise Vorbis reconstruction.

use thiserror::Error;

/// Result type alias for wwriff operations.
pub type WemResult<T> = Result<T, WemError>;

/// Errors that can occur while rebuilding a Vorbis stream from a Wwise container.
///
/// Every variant is fatal for the decode session that raised it. Waiting for more
/// input is not an error and is never reported through this type.
#[derive(Debug, Error)]
pub enum WemError {
    /// The container does not start with a `RIFF`/`RIFX` + `WAVE` header.
    #[error("Container error: {message}")]
    ContainerFormat {
        /// Description of the container problem.
        message: String,
    },

    /// Data was pushed before a codebook library was installed.
    #[error("No codebook library installed")]
    MissingLibrary,

    /// A codebook ID is outside the library or the declared codebook count.
    #[error("Invalid codebook id {id} (limit {limit})")]
    InvalidCodebookId {
        /// The offending codebook ID.
        id: u32,
        /// The exclusive upper bound it was checked against.
        limit: u32,
    },

    /// The bits consumed while rebuilding a codebook don't match its stored size.
    /// This typically indicates the wrong codebook library is being used.
    #[error("Codebook size mismatch: expected {expected} bytes, read {actual} - likely wrong codebook")]
    SizeMismatch {
        /// The stored size in bytes.
        expected: u64,
        /// The number of bytes actually consumed.
        actual: u64,
    },

    /// A stored codebook can't be expressed in canonical form.
    #[error("Codebook error: {message}")]
    Codebook {
        /// Description of the codebook error.
        message: String,
    },

    /// A field of the setup header failed a range check.
    #[error("Setup validation error: {message}")]
    SetupValidation {
        /// Description of the failed check.
        message: String,
    },

    /// The setup fragment was not consumed exactly.
    #[error("Setup framing error: expected {expected} bytes, read {actual}")]
    SetupFraming {
        /// Declared size of the setup fragment.
        expected: u64,
        /// Number of bytes consumed by the rebuild.
        actual: u64,
    },

    /// A bit read ran past the end of its buffer.
    #[error("Read of {requested} bits at bit {position} exceeds buffer of {available} bits")]
    BitBounds {
        /// Bit position of the cursor.
        position: u64,
        /// Number of bits requested.
        requested: u32,
        /// Total bits in the buffer.
        available: u64,
    },

    /// The stream uses a format variant this crate doesn't rebuild.
    #[error("Unsupported format: {message}")]
    UnsupportedFormat {
        /// Description of the unsupported feature.
        message: String,
    },

    /// The input contains malformed chunk or packet framing.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
    },

    /// A write was attempted after the bit writer was ended.
    #[error("Bit writer already ended")]
    WriterClosed,

    /// The input ended before the declared data chunk was fully consumed.
    #[error("Incomplete stream: {message}")]
    IncompleteStream {
        /// Where the stream stopped.
        message: String,
    },

    /// Input was pushed into a session that already failed.
    #[error("Decode session already failed")]
    SessionFailed,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WemError {
    /// Create a new container format error.
    pub fn container(message: impl Into<String>) -> Self {
        WemError::ContainerFormat {
            message: message.into(),
        }
    }

    /// Create a new parse error with the given message.
    pub fn parse(message: impl Into<String>) -> Self {
        WemError::Parse {
            message: message.into(),
        }
    }

    /// Create a new codebook error with the given message.
    pub fn codebook(message: impl Into<String>) -> Self {
        WemError::Codebook {
            message: message.into(),
        }
    }

    /// Create a new setup validation error.
    pub fn setup(message: impl Into<String>) -> Self {
        WemError::SetupValidation {
            message: message.into(),
        }
    }

    /// Create a new unsupported format error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        WemError::UnsupportedFormat {
            message: message.into(),
        }
    }

    /// Create a new incomplete stream error.
    pub fn incomplete(message: impl Into<String>) -> Self {
        WemError::IncompleteStream {
            message: message.into(),
        }
    }

    /// Create a new size mismatch error.
    pub fn size_mismatch(expected: u64, actual: u64) -> Self {
        WemError::SizeMismatch { expected, actual }
    }

    /// Create a new invalid codebook ID error.
    pub fn invalid_codebook_id(id: u32, limit: u32) -> Self {
        WemError::InvalidCodebookId { id, limit }
    }
}
