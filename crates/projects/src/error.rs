//! Project operation errors.

use vox_drive::StoreError;
use vox_transfer::TransferError;
use vox_upload::UploadError;

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("invalid request: {0}")]
    Invalid(#[from] TransferError),

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}
