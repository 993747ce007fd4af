//! Format versions of persisted data.

/// Format version of save files.
/// Increment when the encoding of `PathState` changes.
pub const SAVE_FORMAT_VERSION: u16 = 1;

/// Magic bytes opening a save file.
pub const SAVE_BINARY_MAGIC: [u8; 4] = *b"S3SV";

/// Format version of `sc3 play` traces.
pub const TRACE_FORMAT_VERSION: u16 = 1;
