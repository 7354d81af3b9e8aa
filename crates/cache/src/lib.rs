//! Local, size-bounded voice catalog.

pub mod bounded;
pub mod catalog;

pub use bounded::{BoundedCache, CacheUsage};
pub use catalog::{DEFAULT_CAPACITY, Voice, VoiceCatalog, VoiceKind};

/// Errors from cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("entry of {size} bytes exceeds cache capacity of {capacity} bytes")]
    TooLarge { size: usize, capacity: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
