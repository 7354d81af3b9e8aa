use std::cmp::Reverse;

use tracing::info;
use vox_protocol::{DriveItem, FolderHandle, Project};
use vox_transfer::validate_segment;
use vox_upload::best_effort;

use crate::error::ProjectError;
use crate::library::ProjectLibrary;

/// A project is addressed by its folder name.
fn project_of(item: &DriveItem) -> Project {
    Project {
        id: item.name.clone(),
        name: item.name.clone(),
        created_at: item.created_date_time,
    }
}

/// Newest first; projects without a creation time sort last.
pub(crate) fn sort_newest_first(projects: &mut [Project]) {
    projects.sort_by_key(|p| Reverse(p.created_at));
}

impl ProjectLibrary<'_> {
    /// Lists the project folders at the library root, newest first.
    pub async fn list_projects(&self) -> Result<Vec<Project>, ProjectError> {
        let root = FolderHandle::root();
        let mut projects: Vec<Project> = self
            .store
            .list_children(&root)
            .await?
            .iter()
            .filter(|item| item.is_folder())
            .map(project_of)
            .collect();
        sort_newest_first(&mut projects);
        Ok(projects)
    }

    /// Creates the project folder. Creating an existing project succeeds.
    pub async fn create_project(&self, name: &str) -> Result<Project, ProjectError> {
        validate_segment(name)?;
        let handle = self.resolver().resolve(&[name]).await?;
        info!(project = name, folder = %handle, "project ready");

        let root = FolderHandle::root();
        let created_at = best_effort("project lookup", self.store.lookup(&root, name))
            .await
            .flatten()
            .and_then(|item| item.created_date_time);
        Ok(Project {
            id: name.to_string(),
            name: name.to_string(),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use vox_drive::{MemoryStore, StoreError};

    use super::*;

    #[tokio::test]
    async fn lists_only_folders() {
        let store = MemoryStore::new();
        store.seed_path(&["acme"]);
        store.seed_path(&["globex"]);
        store.seed_file(&FolderHandle::root(), "readme.txt", b"hi");

        let projects = ProjectLibrary::new(&store).list_projects().await.unwrap();
        let mut names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
        names.sort();
        assert_eq!(names, ["acme", "globex"]);
        assert!(projects.iter().all(|p| p.id == p.name));
    }

    #[test]
    fn newest_first() {
        let at = |secs| Some(DateTime::from_timestamp(secs, 0).unwrap());
        let mut projects = vec![
            Project { id: "a".into(), name: "a".into(), created_at: at(10) },
            Project { id: "b".into(), name: "b".into(), created_at: None },
            Project { id: "c".into(), name: "c".into(), created_at: at(30) },
        ];
        sort_newest_first(&mut projects);
        let order: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let store = MemoryStore::new();
        let library = ProjectLibrary::new(&store);

        let first = library.create_project("acme").await.unwrap();
        let second = library.create_project("acme").await.unwrap();
        assert_eq!(first.name, "acme");
        assert!(second.created_at.is_some());
        assert_eq!(store.folder_count(&FolderHandle::root(), "acme"), 1);
    }

    #[tokio::test]
    async fn create_rejects_bad_name() {
        let store = MemoryStore::new();
        let err = ProjectLibrary::new(&store)
            .create_project("a/b")
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectError::Invalid(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn create_surfaces_store_failure() {
        let store = MemoryStore::new();
        store.fail_create(
            "acme",
            StoreError::Status {
                status: 403,
                code: "accessDenied".into(),
                message: "denied".into(),
            },
        );
        let err = ProjectLibrary::new(&store)
            .create_project("acme")
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectError::Upload(_)));
    }
}
