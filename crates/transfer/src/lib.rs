//! Chunked transfer primitives: byte-range planning, sequential chunk
//! reading from an async source, progress percentages and name validation.

mod chunked;
mod progress;
mod types;
mod validation;

pub use chunked::{Chunk, ChunkReader};
pub use progress::{ProgressMeter, progress_percent};
pub use types::{ChunkState, UploadTarget};
pub use validation::{sanitize_folder_name, validate_file_name, validate_segment};

/// Default chunk size: 5 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Chunk sizes must be a multiple of this granule (320 KiB).
pub const CHUNK_GRANULE: u64 = 320 * 1024;

/// Largest chunk the store accepts in one PUT: 60 MiB.
pub const MAX_CHUNK_SIZE: u64 = 60 * 1024 * 1024;

/// Clamps `size` to [`MAX_CHUNK_SIZE`] and rounds it down to a multiple of
/// [`CHUNK_GRANULE`], never below one granule.
pub fn align_chunk_size(size: u64) -> u64 {
    (size.min(MAX_CHUNK_SIZE) / CHUNK_GRANULE).max(1) * CHUNK_GRANULE
}

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path segment: {0}")]
    InvalidSegment(String),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("empty destination path")]
    EmptyDestination,

    #[error("empty file")]
    EmptyFile,

    #[error("chunk size must be positive")]
    ZeroChunkSize,

    #[error("source ended early: expected {expected} bytes at offset {offset}, got {got}")]
    ShortRead { offset: u64, expected: u64, got: u64 },
}
