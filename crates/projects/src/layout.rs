//! Folder layout of a project.

use vox_protocol::Stage;

/// Category folders created under each stage.
pub fn stage_folders(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::Stage1 => &["videos", "documents", "voices"],
        Stage::Stage2 => &["documents", "voices", "scripts"],
        Stage::Stage3 => &["feedback", "voices"],
        Stage::Stage4 => &["videos"],
    }
}

/// Folders of projects created before stages existed.
pub const LEGACY_FOLDERS: [&str; 5] = ["videos", "voices", "documents", "voice-feedback", "AI-voices"];

const DOCUMENT_TYPES: [&str; 5] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/rtf",
    "text/rtf",
];

/// Category folder for a MIME type, or `None` when the type is not accepted.
///
/// Audio goes to `voices`, video to `videos`, text and office documents to
/// `documents`.
pub fn folder_for_mime(mime: &str) -> Option<&'static str> {
    let mime = mime.trim().to_ascii_lowercase();
    let essence = mime.split(';').next().unwrap_or_default().trim();
    if essence.starts_with("audio/") {
        Some("voices")
    } else if essence.starts_with("video/") {
        Some("videos")
    } else if essence.starts_with("text/") || DOCUMENT_TYPES.contains(&essence) {
        Some("documents")
    } else {
        None
    }
}
