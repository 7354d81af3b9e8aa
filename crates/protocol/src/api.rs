use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ResumableSession, Stage};

fn default_category() -> String {
    "videos".to_string()
}

/// Request to open a resumable upload for a project asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub project_name: String,
    #[serde(default)]
    pub stage: Stage,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Folder under the stage; `videos` unless the caller picks another.
    #[serde(default = "default_category")]
    pub category: String,
}

/// Resumable target handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub upload_url: String,
    pub expiration_date_time: DateTime<Utc>,
}

impl From<ResumableSession> for CreateSessionResponse {
    fn from(session: ResumableSession) -> Self {
        Self {
            upload_url: session.upload_url,
            expiration_date_time: session.expires_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A file listed inside a stage category folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// One timestamped comment of a voice feedback report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackComment {
    pub id: String,
    /// Position in the voice track, in seconds.
    pub timestamp: u32,
    pub comment: String,
    #[serde(default)]
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
