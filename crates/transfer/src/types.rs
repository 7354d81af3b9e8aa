use crate::TransferError;
use crate::validation::{validate_file_name, validate_segment};

/// Destination and size of one upload, fixed before any network activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    destination: Vec<String>,
    file_name: String,
    total_size: u64,
}

impl UploadTarget {
    /// Validates and builds a target.
    ///
    /// Rejects an empty destination, any segment that is not a single path
    /// component, an invalid file name and a zero-byte file.
    pub fn new(
        destination: Vec<String>,
        file_name: impl Into<String>,
        total_size: u64,
    ) -> Result<Self, TransferError> {
        if destination.is_empty() {
            return Err(TransferError::EmptyDestination);
        }
        for segment in &destination {
            validate_segment(segment)?;
        }
        let file_name = file_name.into();
        validate_file_name(&file_name)?;
        if total_size == 0 {
            return Err(TransferError::EmptyFile);
        }
        Ok(Self {
            destination,
            file_name,
            total_size,
        })
    }

    pub fn destination(&self) -> &[String] {
        &self.destination
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// `project/stage/category/file` form, for logs.
    pub fn display_path(&self) -> String {
        let mut path = self.destination.join("/");
        path.push('/');
        path.push_str(&self.file_name);
        path
    }
}

/// Byte range of one chunk: `[offset, offset + length)` of `total_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkState {
    pub offset: u64,
    pub length: u64,
    pub total_size: u64,
}

impl ChunkState {
    /// Exclusive end of the range.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Inclusive last byte index.
    pub fn last_byte(&self) -> u64 {
        self.end() - 1
    }

    pub fn is_final(&self) -> bool {
        self.end() == self.total_size
    }

    /// Value of the `Content-Range` header: `bytes {start}-{end}/{total}`.
    pub fn content_range(&self) -> String {
        format!(
            "bytes {}-{}/{}",
            self.offset,
            self.last_byte(),
            self.total_size
        )
    }
}

/// Splits `total_size` bytes into consecutive ranges of at most `chunk_size`.
///
/// Reference for the ranges [`ChunkReader`](crate::ChunkReader) produces.
#[cfg(test)]
pub(crate) fn chunk_plan(total_size: u64, chunk_size: u64) -> Result<Vec<ChunkState>, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::ZeroChunkSize);
    }
    let mut plan = Vec::with_capacity(total_size.div_ceil(chunk_size) as usize);
    let mut offset = 0;
    while offset < total_size {
        let length = chunk_size.min(total_size - offset);
        plan.push(ChunkState {
            offset,
            length,
            total_size,
        });
        offset += length;
    }
    Ok(plan)
}
