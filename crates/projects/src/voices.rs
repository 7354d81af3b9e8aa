use tracing::info;
use vox_protocol::{DriveItem, Stage};
use vox_transfer::{TransferError, sanitize_folder_name, validate_file_name};

use crate::error::ProjectError;
use crate::library::{ProjectLibrary, path_of};

const VOICES_FOLDER: &str = "voices";

impl ProjectLibrary<'_> {
    /// Ensures `project/stage3/voices/{title}` exists; returns its path.
    ///
    /// Characters the library forbids in names are replaced with `_`.
    pub async fn create_voice_folder(
        &self,
        project: &str,
        voice_title: &str,
    ) -> Result<String, ProjectError> {
        let segments = self.voice_folder_path(project, voice_title)?;
        self.resolver().resolve(&segments).await?;
        let path = segments.join("/");
        info!(project, voice = voice_title, %path, "voice folder ready");
        Ok(path)
    }

    /// Copies `project/stage2/voices/{source_file}` into the stage 3 folder
    /// of `voice_title`.
    pub async fn copy_voice(
        &self,
        project: &str,
        voice_title: &str,
        source_file: &str,
    ) -> Result<DriveItem, ProjectError> {
        validate_file_name(source_file)?;
        let source = path_of(&[project, Stage::Stage2.as_str(), VOICES_FOLDER, source_file])?;
        let target = self.voice_folder_path(project, voice_title)?;

        let data = self.store.read_content(&source).await?;
        let folder = self.resolver().resolve(&target).await?;
        let item = self
            .store
            .write_content(&folder, source_file, data, "application/octet-stream")
            .await?;
        info!(
            from = %source.join("/"),
            to = %target.join("/"),
            size = item.size,
            "voice copied"
        );
        Ok(item)
    }

    fn voice_folder_path(&self, project: &str, voice_title: &str) -> Result<Vec<String>, ProjectError> {
        let folder = sanitize_folder_name(voice_title)
            .ok_or_else(|| TransferError::InvalidSegment(voice_title.to_string()))?;
        path_of(&[project, Stage::Stage3.as_str(), VOICES_FOLDER, &folder])
    }
}
