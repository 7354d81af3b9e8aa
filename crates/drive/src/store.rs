//! Vendor-neutral document store contract.

use std::future::Future;
use std::pin::Pin;

use vox_protocol::{ChunkAck, ConflictBehavior, DriveItem, FolderHandle, ResumableSession};
use vox_transfer::ChunkState;

use crate::error::StoreError;

/// Boxed future returned by [`DocumentStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Abstract remote document library.
///
/// [`GraphStore`](crate::GraphStore) implements this against Microsoft
/// Graph. Keeping the pipeline behind a trait lets it run against mocks.
pub trait DocumentStore: Send + Sync {
    /// Looks up `name` directly under `parent`. `Ok(None)` when absent.
    fn lookup<'a>(
        &'a self,
        parent: &'a FolderHandle,
        name: &'a str,
    ) -> StoreFuture<'a, Option<DriveItem>>;

    /// Creates a folder `name` under `parent`.
    ///
    /// With [`ConflictBehavior::Fail`] an existing item yields
    /// [`StoreError::Conflict`].
    fn create_folder<'a>(
        &'a self,
        parent: &'a FolderHandle,
        name: &'a str,
        conflict: ConflictBehavior,
    ) -> StoreFuture<'a, DriveItem>;

    /// Opens a resumable upload session for `file_name` under `parent`.
    fn create_upload_session<'a>(
        &'a self,
        parent: &'a FolderHandle,
        file_name: &'a str,
        file_size: Option<u64>,
        conflict: ConflictBehavior,
    ) -> StoreFuture<'a, ResumableSession>;

    /// Transmits one byte range to a session URL.
    fn put_chunk<'a>(
        &'a self,
        upload_url: &'a str,
        range: ChunkState,
        data: Vec<u8>,
    ) -> StoreFuture<'a, ChunkAck>;

    /// Resolves a root-relative path. `Ok(None)` when any part is absent.
    fn item_by_path<'a>(&'a self, path: &'a [String]) -> StoreFuture<'a, Option<DriveItem>>;

    /// Lists the direct children of a folder.
    fn list_children<'a>(&'a self, folder: &'a FolderHandle) -> StoreFuture<'a, Vec<DriveItem>>;

    /// Deletes an item by id.
    fn delete_item<'a>(&'a self, item_id: &'a str) -> StoreFuture<'a, ()>;

    /// Downloads the content of the file at a root-relative path.
    fn read_content<'a>(&'a self, path: &'a [String]) -> StoreFuture<'a, Vec<u8>>;

    /// Writes `data` as file `name` under `parent`, replacing any existing file.
    fn write_content<'a>(
        &'a self,
        parent: &'a FolderHandle,
        name: &'a str,
        data: Vec<u8>,
        content_type: &'a str,
    ) -> StoreFuture<'a, DriveItem>;
}
