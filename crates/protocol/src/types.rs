use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::drive::DriveItem;

/// Rule applied when a create targets a name that already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictBehavior {
    #[default]
    Fail,
    Replace,
    Rename,
}

impl ConflictBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Replace => "replace",
            Self::Rename => "rename",
        }
    }
}

impl fmt::Display for ConflictBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "replace" | "overwrite" => Ok(Self::Replace),
            "rename" => Ok(Self::Rename),
            other => Err(format!("unknown conflict behavior: {other}")),
        }
    }
}

/// Workflow stage a project folder is split into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// Original video campaign.
    #[default]
    #[serde(rename = "stage1")]
    Stage1,
    /// Script and voice iteration.
    #[serde(rename = "stage2")]
    Stage2,
    /// Voice feedback.
    #[serde(rename = "stage3")]
    Stage3,
    /// Final delivery.
    #[serde(rename = "stage4")]
    Stage4,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Self::Stage1, Self::Stage2, Self::Stage3, Self::Stage4];

    /// Folder name of the stage under a project.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stage1 => "stage1",
            Self::Stage2 => "stage2",
            Self::Stage3 => "stage3",
            Self::Stage4 => "stage4",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stage1" | "1" => Ok(Self::Stage1),
            "stage2" | "2" => Ok(Self::Stage2),
            "stage3" | "3" => Ok(Self::Stage3),
            "stage4" | "4" => Ok(Self::Stage4),
            other => Err(format!("unknown stage: {other}")),
        }
    }
}

/// Opaque identifier of a folder that exists in the remote store.
///
/// Handles are only minted by the store (lookup or create), except for
/// [`FolderHandle::root`], which addresses the library root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderHandle(String);

impl FolderHandle {
    const ROOT: &'static str = "root";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Handle of the document library root.
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }
}

impl fmt::Display for FolderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&DriveItem> for FolderHandle {
    fn from(item: &DriveItem) -> Self {
        Self(item.id.clone())
    }
}

/// Server-issued, time-limited endpoint that accepts sequential byte ranges.
///
/// Matches the body of Graph's `createUploadSession` response; the
/// `nextExpectedRanges` field is ignored because a fresh session always
/// starts at byte zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumableSession {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    #[serde(rename = "expirationDateTime")]
    pub expires_at: DateTime<Utc>,
}

impl ResumableSession {
    /// A session known only by its URL; it never counts as expired.
    pub fn without_expiry(upload_url: impl Into<String>) -> Self {
        Self {
            upload_url: upload_url.into(),
            expires_at: DateTime::<Utc>::MAX_UTC,
        }
    }

    /// Returns `true` once `now` has reached the session expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Store acknowledgment of one transmitted chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkAck {
    /// More bytes expected (HTTP 202).
    Accepted { next_expected_ranges: Vec<String> },
    /// The store assembled the full file (HTTP 200/201).
    Completed { item: Option<DriveItem> },
}

impl ChunkAck {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}
