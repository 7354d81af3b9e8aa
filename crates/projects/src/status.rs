//! Per-project workflow status stored as `status.json` at the project root.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use vox_upload::best_effort;

use crate::error::ProjectError;
use crate::library::{ProjectLibrary, path_of};

pub const STATUS_FILE: &str = "status.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStatus {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub href: String,
    pub status: String,
    #[serde(default)]
    pub steps: Vec<StepStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepStatus {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub component: String,
    pub status: String,
}

fn step(title: &str, description: &str, component: &str) -> StepStatus {
    StepStatus {
        title: title.into(),
        description: description.into(),
        component: component.into(),
        status: "pending".into(),
    }
}

fn stage(id: u32, title: &str, description: &str, steps: Vec<StepStatus>) -> StageStatus {
    StageStatus {
        id,
        title: title.into(),
        description: description.into(),
        href: format!("/stage{id}/dashboard"),
        status: "pending".into(),
        steps,
    }
}

/// Plan of a project that has never saved a status.
pub fn default_stages() -> Vec<StageStatus> {
    let mut stages = vec![
        stage(1, "Stage 1: Original Video Campaign", "Upload and process the original video", vec![
            step("Original Video Campaign", "Upload and manage your original video content", "VideoUpload"),
            step("Auditioning Brief", "Create and review the auditioning requirements", "AuditioningBrief"),
            step("Voice Selection", "Listen to and manage voice auditions", "VoiceSelection"),
        ]),
        stage(2, "Stage 2: Script & Timestamps", "Define script and set timestamps", vec![
            step("Script Upload", "Upload and manage your script", "ScriptUpload"),
            step("Timestamp Editor", "Set and edit timestamps for your script", "TimestampEditor"),
        ]),
        stage(3, "Stage 3: Voice Selection", "Review and select voice options", vec![
            step("Base Voice Selection", "Choose your preferred base voice", "BaseVoiceSelection"),
            step("Custom Voice Selection", "Review and select custom voice options", "CustomVoiceSelection"),
        ]),
        stage(4, "Stage 4: Final Review", "Choose and approve the final voice", vec![
            step("Final Voice Review", "Review and approve the final voice output", "FinalVoiceReview"),
        ]),
    ];
    stages[0].status = "in_progress".into();
    stages[0].steps[0].status = "in_progress".into();
    stages
}

/// Extracts the stage list from a stored document.
///
/// Accepts `{ "stages": [...] }` or a bare array.
pub fn parse_stages(raw: &[u8]) -> Result<Vec<StageStatus>, serde_json::Error> {
    let mut doc: Value = serde_json::from_slice(raw)?;
    let stages = match doc.get_mut("stages") {
        Some(stages) => stages.take(),
        None => doc,
    };
    serde_json::from_value(stages)
}

#[derive(Serialize)]
struct StatusDocument<'a> {
    stages: &'a [StageStatus],
}

impl ProjectLibrary<'_> {
    /// Saved stages of `project`, or [`default_stages`] when none are readable.
    pub async fn get_status(&self, project: &str) -> Result<Vec<StageStatus>, ProjectError> {
        let path = path_of(&[project, STATUS_FILE])?;
        let Some(raw) = best_effort("status read", self.store.read_content(&path)).await else {
            return Ok(default_stages());
        };
        match parse_stages(&raw) {
            Ok(stages) => Ok(stages),
            Err(e) => {
                debug!(project, error = %e, "unreadable status, using defaults");
                Ok(default_stages())
            }
        }
    }

    pub async fn set_status(&self, project: &str, stages: &[StageStatus]) -> Result<(), ProjectError> {
        let segments = path_of(&[project])?;
        let body = serde_json::to_vec_pretty(&StatusDocument { stages })?;
        let folder = self.resolver().resolve(&segments).await?;
        self.store
            .write_content(&folder, STATUS_FILE, body, "application/json")
            .await?;
        info!(project, stages = stages.len(), "status saved");
        Ok(())
    }
}
