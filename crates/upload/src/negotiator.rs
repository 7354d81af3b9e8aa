//! Upload session negotiation.

use tracing::debug;
use vox_drive::DocumentStore;
use vox_protocol::{ConflictBehavior, FolderHandle, ResumableSession};
use vox_transfer::{TransferError, validate_file_name};

use crate::error::UploadError;

/// Asks the store for a resumable upload target under a folder.
pub struct SessionNegotiator<'a> {
    store: &'a dyn DocumentStore,
    conflict: ConflictBehavior,
}

impl<'a> SessionNegotiator<'a> {
    pub fn new(store: &'a dyn DocumentStore, conflict: ConflictBehavior) -> Self {
        Self { store, conflict }
    }

    /// Opens a session for `file_name` under `parent`.
    ///
    /// A rejection by the store is terminal.
    pub async fn open(
        &self,
        parent: &FolderHandle,
        file_name: &str,
        expected_size: Option<u64>,
    ) -> Result<ResumableSession, UploadError> {
        validate_file_name(file_name)?;
        if expected_size == Some(0) {
            return Err(TransferError::EmptyFile.into());
        }

        let session = self
            .store
            .create_upload_session(parent, file_name, expected_size, self.conflict)
            .await
            .map_err(UploadError::SessionRejected)?;

        debug!(
            parent = %parent,
            file = %file_name,
            expires_at = %session.expires_at,
            "upload session opened"
        );
        Ok(session)
    }
}
