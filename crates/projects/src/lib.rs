//! Project-level operations on the document library.
//!
//! A project is a root folder split into stage folders
//! (`stage1` … `stage4`), each holding fixed category folders. Everything
//! here goes through [`vox_drive::DocumentStore`] and reuses the upload
//! crate's [`FolderPathResolver`](vox_upload::FolderPathResolver) for
//! get-or-create.

pub mod error;
pub mod feedback;
pub mod files;
pub mod layout;
pub mod library;
pub mod projects;
pub mod status;
pub mod voices;

pub use error::ProjectError;
pub use feedback::{FeedbackReport, feedback_file_name, parse_feedback};
pub use layout::{LEGACY_FOLDERS, folder_for_mime, stage_folders};
pub use library::ProjectLibrary;
pub use status::{StageStatus, StepStatus, default_stages, parse_stages};
