use vox_protocol::{ConflictBehavior, DriveItem};
use vox_transfer::DEFAULT_CHUNK_SIZE;

/// Tunables of the upload pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    /// Bytes per chunk PUT.
    pub chunk_size: u64,
    /// Policy when the file name already exists in the destination.
    pub conflict: ConflictBehavior,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            conflict: ConflictBehavior::Replace,
        }
    }
}

/// Event emitted while an upload runs.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// Destination folders exist.
    Resolved { path: String },
    /// A resumable session was opened.
    SessionOpened { path: String },
    /// A chunk was acknowledged.
    Progress { path: String, percent: u8 },
    /// The store confirmed the file.
    Completed { path: String },
    /// The upload stopped with a terminal error.
    Failed { path: String, error: String },
}

/// Result of a finished upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    /// `project/stage/category/file`.
    pub path: String,
    pub bytes: u64,
    /// Item descriptor returned with the final acknowledgment, if any.
    pub item: Option<DriveItem>,
}
