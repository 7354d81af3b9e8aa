//! Chunked upload pipeline for the remote document library.
//!
//! This crate holds the upload **business logic**. It talks to the store
//! only through [`vox_drive::DocumentStore`], so it runs unchanged against
//! Microsoft Graph or an in-memory store.
//!
//! # Pipeline
//!
//! 1. **Resolve**: get-or-create `project/stage/category` ([`FolderPathResolver`])
//! 2. **Negotiate**: open a resumable upload session ([`SessionNegotiator`])
//! 3. **Sequence**: PUT ordered byte ranges until the store confirms ([`ChunkSequencer`])

pub mod best_effort;
pub mod error;
pub mod negotiator;
pub mod pipeline;
pub mod resolver;
pub mod sequencer;
pub mod state;
pub mod types;

// Re-export primary types for convenience.
pub use best_effort::best_effort;
pub use error::UploadError;
pub use negotiator::SessionNegotiator;
pub use pipeline::Uploader;
pub use resolver::FolderPathResolver;
pub use sequencer::ChunkSequencer;
pub use state::{UploadPhase, UploadState};
pub use types::{UploadEvent, UploadOptions, UploadOutcome};
