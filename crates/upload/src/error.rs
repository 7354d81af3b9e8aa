//! Upload error types.

use chrono::{DateTime, Utc};
use vox_drive::StoreError;
use vox_transfer::TransferError;

use crate::state::UploadPhase;

/// Terminal errors of the upload pipeline. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid upload: {0}")]
    Invalid(#[from] TransferError),

    #[error("cannot resolve folder {segment:?}: {source}")]
    Folder {
        segment: String,
        #[source]
        source: StoreError,
    },

    #[error("{segment:?} exists but is not a folder")]
    NotAFolder { segment: String },

    #[error("upload session rejected: {0}")]
    SessionRejected(#[source] StoreError),

    #[error("upload session expired at {expired_at} (offset {offset}): {source}")]
    SessionExpired {
        expired_at: DateTime<Utc>,
        offset: u64,
        #[source]
        source: StoreError,
    },

    #[error("chunk at offset {offset} failed: {source}")]
    Chunk {
        offset: u64,
        #[source]
        source: StoreError,
    },

    #[error("store finished the upload early at offset {offset} of {total}")]
    EarlyCompletion { offset: u64, total: u64 },

    #[error("store still expects {next_expected:?} after the last byte")]
    Incomplete { next_expected: Vec<String> },

    #[error("cancelled")]
    Cancelled,

    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: UploadPhase, to: UploadPhase },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl UploadError {
    /// HTTP status reported by the store, when the failure came from it.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Folder { source, .. }
            | Self::SessionRejected(source)
            | Self::SessionExpired { source, .. }
            | Self::Chunk { source, .. }
            | Self::Store(source) => source.status(),
            _ => None,
        }
    }
}
