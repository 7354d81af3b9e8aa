use std::path::Path;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::types::ChunkState;
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// One chunk read from the source, with its byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub state: ChunkState,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a source of exactly `total_size` bytes in fixed-size chunks.
///
/// Each call to [`next_chunk`](Self::next_chunk) reads
/// `min(chunk_size, total_size - offset)` bytes. A source that ends before
/// `total_size` is an error, never a short final chunk.
pub struct ChunkReader<R> {
    source: R,
    chunk_size: u64,
    offset: u64,
    total_size: u64,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// Wraps `source`. If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(source: R, total_size: u64, chunk_size: u64) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            source,
            chunk_size,
            offset: 0,
            total_size,
        }
    }

    /// Reads the next chunk. Returns `None` once `total_size` bytes were read.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(None);
        }

        let length = remaining.min(self.chunk_size);
        let mut buf = vec![0u8; length as usize];
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = self.source.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(TransferError::ShortRead {
                    offset: self.offset,
                    expected: length,
                    got: filled as u64,
                });
            }
            filled += n;
        }

        let state = ChunkState {
            offset: self.offset,
            length,
            total_size: self.total_size,
        };
        self.offset += length;
        Ok(Some(Chunk { state, data: buf }))
    }

    /// Current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.total_size - self.offset
    }
}

impl ChunkReader<tokio::fs::File> {
    /// Opens `path` and sizes the reader from the file metadata.
    pub async fn open(path: &Path, chunk_size: u64) -> Result<Self, TransferError> {
        let file = tokio::fs::File::open(path).await?;
        let total_size = file.metadata().await?.len();
        Ok(Self::new(file, total_size, chunk_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_all_chunks() {
        let data = b"AABBCCDDEE".to_vec(); // 10 bytes.
        let mut reader = ChunkReader::new(data.as_slice(), 10, 4);
        assert_eq!(reader.remaining(), 10);

        let c1 = reader.next_chunk().await.unwrap().unwrap();
        assert_eq!(c1.state.offset, 0);
        assert_eq!(c1.state.length, 4);
        assert_eq!(&c1.data, b"AABB");
        assert_eq!(reader.remaining(), 6);

        let c2 = reader.next_chunk().await.unwrap().unwrap();
        assert_eq!(c2.state.offset, 4);
        assert_eq!(&c2.data, b"CCDD");

        let c3 = reader.next_chunk().await.unwrap().unwrap();
        assert_eq!(c3.state.offset, 8);
        assert_eq!(c3.state.length, 2);
        assert_eq!(&c3.data, b"EE");
        assert!(c3.state.is_final());

        assert!(reader.next_chunk().await.unwrap().is_none());
        assert_eq!(reader.offset(), 10);
    }

    #[tokio::test]
    async fn ranges_follow_the_chunk_plan() {
        let data = vec![1u8; 1_000];
        let mut reader = ChunkReader::new(data.as_slice(), 1_000, 320);
        let mut ranges = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            ranges.push(chunk.state);
        }
        assert_eq!(ranges, crate::types::chunk_plan(1_000, 320).unwrap());
    }

    #[tokio::test]
    async fn stops_at_total_size() {
        // Source longer than declared: only total_size bytes are consumed.
        let data = b"0123456789".to_vec();
        let mut reader = ChunkReader::new(data.as_slice(), 6, 4);
        let c1 = reader.next_chunk().await.unwrap().unwrap();
        let c2 = reader.next_chunk().await.unwrap().unwrap();
        assert_eq!(&c1.data, b"0123");
        assert_eq!(&c2.data, b"45");
        assert!(reader.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn short_source_is_error() {
        let data = b"abc".to_vec();
        let mut reader = ChunkReader::new(data.as_slice(), 8, 4);
        let err = reader.next_chunk().await.unwrap_err();
        match err {
            TransferError::ShortRead {
                offset,
                expected,
                got,
            } => {
                assert_eq!(offset, 0);
                assert_eq!(expected, 4);
                assert_eq!(got, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn zero_chunk_size_uses_default() {
        let data = vec![7u8; 3];
        let reader = ChunkReader::new(data.as_slice(), 3, 0);
        assert_eq!(reader.chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[tokio::test]
    async fn open_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.bin");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"The quick brown fox").unwrap();
        drop(f);

        let mut reader = ChunkReader::open(&path, 8).await.unwrap();
        assert_eq!(reader.total_size(), 19);

        let mut out = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            out.extend_from_slice(&chunk.data);
        }
        assert_eq!(&out, b"The quick brown fox");
    }
}
