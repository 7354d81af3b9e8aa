//! Wire types shared by the Vox crates.
//!
//! `drive` mirrors the JSON shapes of the remote document library (Microsoft
//! Graph drive items, upload sessions, error bodies). `api` holds the
//! request/response contracts the rest of the application speaks.

pub mod api;
pub mod drive;
pub mod types;

// Re-export primary types for convenience.
pub use api::{
    CreateSessionRequest, CreateSessionResponse, ErrorResponse, FeedbackComment, Project,
    ProjectFile,
};
pub use drive::{DriveItem, FileFacet, FolderFacet};
pub use types::{ChunkAck, ConflictBehavior, FolderHandle, ResumableSession, Stage};
