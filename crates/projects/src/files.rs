use std::collections::BTreeMap;

use tracing::{debug, info};
use vox_protocol::{DriveItem, FolderHandle, ProjectFile, Stage};
use vox_transfer::validate_file_name;
use vox_upload::best_effort;

use crate::error::ProjectError;
use crate::layout::{LEGACY_FOLDERS, folder_for_mime, stage_folders};
use crate::library::{ProjectLibrary, path_of};

fn project_file(item: &DriveItem) -> ProjectFile {
    ProjectFile {
        name: item.name.clone(),
        size: item.size,
        web_url: item.web_url.clone(),
        mime_type: item.file.as_ref().and_then(|f| f.mime_type.clone()),
    }
}

impl ProjectLibrary<'_> {
    /// Files of every stage and legacy folder of `project`.
    ///
    /// Keys are `"{stage}_{category}"` for stage folders and the bare name
    /// for legacy folders. Folders that are missing or unreadable map to an
    /// empty list.
    pub async fn list_project_files(
        &self,
        project: &str,
    ) -> Result<BTreeMap<String, Vec<ProjectFile>>, ProjectError> {
        path_of(&[project])?;

        let mut listing = BTreeMap::new();
        for stage in Stage::ALL {
            for category in stage_folders(stage) {
                let files = self.files_in(&[project, stage.as_str(), category]).await;
                listing.insert(format!("{stage}_{category}"), files);
            }
        }
        for legacy in LEGACY_FOLDERS {
            let files = self.files_in(&[project, legacy]).await;
            listing.insert(legacy.to_string(), files);
        }
        Ok(listing)
    }

    async fn files_in(&self, path: &[&str]) -> Vec<ProjectFile> {
        let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        let Some(Some(folder)) = best_effort("folder lookup", self.store.item_by_path(&path)).await
        else {
            return Vec::new();
        };
        if !folder.is_folder() {
            debug!(path = %path.join("/"), "not a folder, skipping");
            return Vec::new();
        }
        let handle = FolderHandle::from(&folder);
        best_effort("folder listing", self.store.list_children(&handle))
            .await
            .unwrap_or_default()
            .iter()
            .filter(|item| item.is_file())
            .map(project_file)
            .collect()
    }

    /// Stores a small file in one request.
    ///
    /// The category folder is `folder` when given, else derived from
    /// `mime`. Without a stage the file lands in the legacy
    /// `project/{folder}` layout.
    pub async fn upload_file(
        &self,
        project: &str,
        stage: Option<Stage>,
        folder: Option<&str>,
        file_name: &str,
        mime: &str,
        data: Vec<u8>,
    ) -> Result<DriveItem, ProjectError> {
        let derived =
            folder_for_mime(mime).ok_or_else(|| ProjectError::UnsupportedType(mime.to_string()))?;
        let folder = folder.unwrap_or(derived);
        validate_file_name(file_name)?;

        let segments = match stage {
            Some(stage) => path_of(&[project, stage.as_str(), folder])?,
            None => path_of(&[project, folder])?,
        };
        let parent = self.resolver().resolve(&segments).await?;
        let item = self
            .store
            .write_content(&parent, file_name, data, mime)
            .await?;
        info!(path = %segments.join("/"), file = file_name, size = item.size, "file stored");
        Ok(item)
    }

    /// Deletes `project/{category_path}/{name}`.
    ///
    /// `category_path` may span several folders, e.g. `stage1/videos`.
    pub async fn delete_file(
        &self,
        project: &str,
        category_path: &str,
        name: &str,
    ) -> Result<(), ProjectError> {
        let mut parts = vec![project];
        parts.extend(category_path.split('/').filter(|s| !s.is_empty()));
        parts.push(name);
        let path = path_of(&parts)?;

        let item = self
            .store
            .item_by_path(&path)
            .await?
            .ok_or_else(|| ProjectError::NotFound(path.join("/")))?;
        self.store.delete_item(&item.id).await?;
        info!(path = %path.join("/"), "file deleted");
        Ok(())
    }
}
