use crate::TransferError;

/// Characters the document library refuses in item names.
const RESERVED_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '#', '%', '&', '{', '}', '~'];

/// Validates that `segment` is a single folder name.
///
/// Rejects:
/// - Empty or whitespace-only names
/// - Path separators (`/`, `\`)
/// - `.` and `..`
/// - Control characters
pub fn validate_segment(segment: &str) -> Result<(), TransferError> {
    check_component(segment).map_err(|reason| {
        TransferError::InvalidSegment(format!("{reason}: {segment:?}"))
    })
}

/// Validates a file name with the same rules as [`validate_segment`].
pub fn validate_file_name(name: &str) -> Result<(), TransferError> {
    check_component(name)
        .map_err(|reason| TransferError::InvalidFileName(format!("{reason}: {name:?}")))
}

fn check_component(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("empty name");
    }
    if name.contains(['/', '\\']) {
        return Err("path separator not allowed");
    }
    if name == "." || name == ".." {
        return Err("relative component not allowed");
    }
    if name.chars().any(char::is_control) {
        return Err("control character not allowed");
    }
    Ok(())
}

/// Replaces every reserved character with `_` and trims the result.
///
/// Returns `None` when nothing usable remains.
pub fn sanitize_folder_name(title: &str) -> Option<String> {
    let cleaned: String = title
        .chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
