//! Idempotent get-or-create of nested folder paths.

use tracing::{debug, info};
use vox_drive::DocumentStore;
use vox_protocol::{ConflictBehavior, DriveItem, FolderHandle};
use vox_transfer::{TransferError, validate_segment};

use crate::error::UploadError;

/// Ensures a nested folder path exists and returns its last folder.
///
/// Each segment is looked up under the current parent and created only when
/// absent. A create that loses a race against another caller (conflict) is
/// settled by looking the folder up again. There is no client-side lock.
pub struct FolderPathResolver<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> FolderPathResolver<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Resolves `segments` from the library root.
    ///
    /// Every segment is validated before the first store call.
    pub async fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> Result<FolderHandle, UploadError> {
        if segments.is_empty() {
            return Err(TransferError::EmptyDestination.into());
        }
        for segment in segments {
            validate_segment(segment.as_ref())?;
        }

        let mut parent = FolderHandle::root();
        for segment in segments {
            parent = self.resolve_child(&parent, segment.as_ref()).await?;
        }
        Ok(parent)
    }

    async fn resolve_child(
        &self,
        parent: &FolderHandle,
        name: &str,
    ) -> Result<FolderHandle, UploadError> {
        let found = self
            .store
            .lookup(parent, name)
            .await
            .map_err(|source| folder_error(name, source))?;
        if let Some(item) = found {
            return as_folder(&item, name);
        }

        match self
            .store
            .create_folder(parent, name, ConflictBehavior::Fail)
            .await
        {
            Ok(item) => {
                info!(parent = %parent, folder = %name, "folder created");
                as_folder(&item, name)
            }
            Err(e) if e.is_conflict() => {
                debug!(parent = %parent, folder = %name, "created concurrently, re-resolving");
                match self.store.lookup(parent, name).await {
                    Ok(Some(item)) => as_folder(&item, name),
                    Ok(None) => Err(folder_error(name, e)),
                    Err(source) => Err(folder_error(name, source)),
                }
            }
            Err(source) => Err(folder_error(name, source)),
        }
    }
}

fn as_folder(item: &DriveItem, name: &str) -> Result<FolderHandle, UploadError> {
    if item.is_folder() {
        Ok(FolderHandle::from(item))
    } else {
        Err(UploadError::NotAFolder {
            segment: name.to_string(),
        })
    }
}

fn folder_error(name: &str, source: vox_drive::StoreError) -> UploadError {
    UploadError::Folder {
        segment: name.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vox_drive::{MemoryStore, StoreCall, StoreError};

    fn lookup(parent: &str, name: &str) -> StoreCall {
        StoreCall::Lookup {
            parent: parent.into(),
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn creates_missing_path() {
        let store = MemoryStore::new();
        let resolver = FolderPathResolver::new(&store);
        let handle = resolver.resolve(&["p1", "stage1", "videos"]).await.unwrap();

        assert!(!handle.is_root());
        assert_eq!(store.create_count(), 3);
        let videos = store.seed_path(&["p1", "stage1", "videos"]);
        assert_eq!(videos, handle);
    }

    #[tokio::test]
    async fn second_resolve_is_idempotent() {
        let store = MemoryStore::new();
        let resolver = FolderPathResolver::new(&store);
        let first = resolver.resolve(&["p1", "stage1", "videos"]).await.unwrap();
        let second = resolver.resolve(&["p1", "stage1", "videos"]).await.unwrap();

        assert_eq!(first, second);
        // At most one create per segment across both calls.
        assert_eq!(store.create_count(), 3);
    }

    #[tokio::test]
    async fn creates_only_missing_segments() {
        let store = MemoryStore::new();
        let acme = store.seed_path(&["acme"]);
        let resolver = FolderPathResolver::new(&store);
        resolver.resolve(&["acme", "stage2", "voices"]).await.unwrap();

        let calls = store.calls();
        let stage2 = store.seed_path(&["acme", "stage2"]);
        assert_eq!(
            calls,
            vec![
                lookup("root", "acme"),
                lookup(acme.id(), "stage2"),
                StoreCall::CreateFolder {
                    parent: acme.id().into(),
                    name: "stage2".into()
                },
                lookup(stage2.id(), "voices"),
                StoreCall::CreateFolder {
                    parent: stage2.id().into(),
                    name: "voices".into()
                },
            ]
        );
        assert_eq!(store.create_count(), 2);
    }

    #[tokio::test]
    async fn lost_race_re_resolves() {
        let store = MemoryStore::new();
        store.race_create("stage1");
        let resolver = FolderPathResolver::new(&store);
        let handle = resolver.resolve(&["p1", "stage1"]).await.unwrap();

        let p1 = store.seed_path(&["p1"]);
        assert_eq!(store.folder_count(&p1, "stage1"), 1);
        assert_eq!(handle, store.seed_path(&["p1", "stage1"]));
    }

    #[tokio::test]
    async fn concurrent_resolvers_agree() {
        let store = MemoryStore::new();
        let a = FolderPathResolver::new(&store);
        let b = FolderPathResolver::new(&store);

        let (ha, hb) = tokio::join!(a.resolve(&["new-project"]), b.resolve(&["new-project"]));
        let (ha, hb) = (ha.unwrap(), hb.unwrap());

        assert_eq!(ha, hb);
        assert_eq!(store.folder_count(&FolderHandle::root(), "new-project"), 1);
    }

    #[tokio::test]
    async fn file_in_the_way_is_terminal() {
        let store = MemoryStore::new();
        let acme = store.seed_path(&["acme"]);
        store.seed_file(&acme, "stage1", b"not a folder");

        let err = FolderPathResolver::new(&store)
            .resolve(&["acme", "stage1", "videos"])
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::NotAFolder { ref segment } if segment == "stage1"));
    }

    #[tokio::test]
    async fn permission_denied_is_terminal() {
        let store = MemoryStore::new();
        store.fail_create(
            "locked",
            StoreError::Status {
                status: 403,
                code: "accessDenied".into(),
                message: "denied".into(),
            },
        );
        let err = FolderPathResolver::new(&store)
            .resolve(&["locked"])
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
        // Not retried.
        assert_eq!(store.create_count(), 1);
    }

    #[tokio::test]
    async fn invalid_segment_rejected_before_network() {
        let store = MemoryStore::new();
        let err = FolderPathResolver::new(&store)
            .resolve(&["acme", "stage1/videos"])
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Invalid(TransferError::InvalidSegment(_))));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_path_rejected() {
        let store = MemoryStore::new();
        let empty: [&str; 0] = [];
        let err = FolderPathResolver::new(&store).resolve(&empty).await.unwrap_err();
        assert!(matches!(err, UploadError::Invalid(TransferError::EmptyDestination)));
    }
}
