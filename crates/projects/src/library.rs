use vox_drive::DocumentStore;
use vox_transfer::validate_segment;
use vox_upload::FolderPathResolver;

use crate::error::ProjectError;

/// Handle on the projects of one document library.
///
/// Operations are grouped by concern in the sibling modules.
pub struct ProjectLibrary<'a> {
    pub(crate) store: &'a dyn DocumentStore,
}

impl<'a> ProjectLibrary<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub(crate) fn resolver(&self) -> FolderPathResolver<'a> {
        FolderPathResolver::new(self.store)
    }
}

/// Validates every segment and returns them as owned path parts.
pub(crate) fn path_of(segments: &[&str]) -> Result<Vec<String>, ProjectError> {
    segments
        .iter()
        .map(|s| {
            validate_segment(s)?;
            Ok(s.to_string())
        })
        .collect()
}
