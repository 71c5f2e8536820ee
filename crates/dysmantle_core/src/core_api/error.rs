use std::error::Error;
use std::fmt;

/// Stable error categories exposed to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    /// Ambient I/O failure (reading the input file, timestamping, ...).
    Io,
    /// Input is shorter than the fixed container header.
    TooShort,
    /// The compressed payload is not a valid zlib stream.
    CorruptPayload,
    /// No XML declaration signature anywhere in the decompressed buffer.
    RegionNotFound,
    /// A declaration was found but the document region cannot be delimited.
    MalformedRegion,
    /// The located region is not structurally valid XML.
    InvalidDocument,
    /// The document parses but has no player-state array.
    PlayerStateMissing,
    /// The edited document no longer fits its reserved byte span.
    RegionOverflow,
    /// Internal length invariant violated while reassembling the buffer.
    LengthMismatch,
    /// The pre-edit backup copy could not be created.
    BackupFailed,
    /// The output file could not be written.
    WriteFailed,
    /// A single edit was rejected; the session stays usable.
    InvalidEdit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CoreError {}
