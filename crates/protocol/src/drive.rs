use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ConflictBehavior;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A file or folder in the document library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<FolderFacet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileFacet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<DateTime<Utc>>,
}

impl DriveItem {
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }

    pub fn is_file(&self) -> bool {
        self.file.is_some()
    }
}

/// Present on folder items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    #[serde(default)]
    pub child_count: u64,
}

/// Present on file items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A page of a collection response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Drive {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Serializes as `{}`; Graph marks a new item as a folder this way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmptyFacet {}

/// Body of `POST .../children` creating a folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateFolderRequest {
    pub name: String,
    pub folder: EmptyFacet,
    #[serde(rename = "@microsoft.graph.conflictBehavior")]
    pub conflict_behavior: ConflictBehavior,
}

impl CreateFolderRequest {
    pub fn new(name: impl Into<String>, conflict_behavior: ConflictBehavior) -> Self {
        Self {
            name: name.into(),
            folder: EmptyFacet::default(),
            conflict_behavior,
        }
    }
}

/// Body of `POST ...:/createUploadSession`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateUploadSessionRequest {
    pub item: UploadSessionItem,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSessionItem {
    #[serde(rename = "@microsoft.graph.conflictBehavior")]
    pub conflict_behavior: ConflictBehavior,
    pub name: String,
    #[serde(rename = "fileSize", skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Body of a 202 answer to a chunk PUT.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatusBody {
    #[serde(default)]
    pub next_expected_ranges: Vec<String>,
    #[serde(default)]
    pub expiration_date_time: Option<DateTime<Utc>>,
}

/// Graph error envelope: `{ "error": { "code", "message" } }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphErrorBody {
    pub error: GraphError,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// OAuth2 token endpoint response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFLICT_BEHAVIOR_KEY: &str = "@microsoft.graph.conflictBehavior";

    #[test]
    fn create_folder_request_shape() {
        let req = CreateFolderRequest::new("stage2", ConflictBehavior::Fail);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["name"], "stage2");
        assert_eq!(json["folder"], serde_json::json!({}));
        assert_eq!(json[CONFLICT_BEHAVIOR_KEY], "fail");
    }

    #[test]
    fn upload_session_request_omits_missing_size() {
        let req = CreateUploadSessionRequest {
            item: UploadSessionItem {
                conflict_behavior: ConflictBehavior::Replace,
                name: "take1.mp4".into(),
                file_size: None,
            },
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("fileSize"));
        assert!(json.contains(r#""@microsoft.graph.conflictBehavior":"replace""#));

        let sized = CreateUploadSessionRequest {
            item: UploadSessionItem {
                file_size: Some(42),
                ..req.item
            },
        };
        let json = serde_json::to_value(&sized).unwrap();
        assert_eq!(json["item"]["fileSize"], 42);
    }

    #[test]
    fn drive_item_facets() {
        let json = r#"{"value":[
            {"id":"1","name":"videos","folder":{"childCount":3}},
            {"id":"2","name":"cut.mp4","size":1024,"webUrl":"https://x/cut.mp4","file":{"mimeType":"video/mp4"}}
        ]}"#;
        let page: Collection<DriveItem> = serde_json::from_str(json).unwrap();
        assert_eq!(page.value.len(), 2);
        assert!(page.value[0].is_folder());
        assert_eq!(page.value[0].folder.as_ref().unwrap().child_count, 3);
        assert!(page.value[1].is_file());
        assert_eq!(
            page.value[1].file.as_ref().unwrap().mime_type.as_deref(),
            Some("video/mp4")
        );
        assert!(page.next_link.is_none());
    }

    #[test]
    fn graph_error_body() {
        let json = r#"{"error":{"code":"nameAlreadyExists","message":"Name already exists"}}"#;
        let body: GraphErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.error.code, "nameAlreadyExists");
    }

    #[test]
    fn upload_status_body_defaults() {
        let body: UploadStatusBody =
            serde_json::from_str(r#"{"nextExpectedRanges":["5242880-"]}"#).unwrap();
        assert_eq!(body.next_expected_ranges, vec!["5242880-".to_string()]);
        assert!(body.expiration_date_time.is_none());
    }
}
