//! Plain-text voice feedback reports kept under `project/stage3/feedback`.

use std::fmt::Write as _;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info};
use vox_protocol::{DriveItem, FeedbackComment, FolderHandle, Stage};
use vox_transfer::validate_file_name;
use vox_upload::best_effort;

use crate::error::ProjectError;
use crate::library::{ProjectLibrary, path_of};

const FEEDBACK_FOLDER: &str = "feedback";
const FILE_PREFIX: &str = "feedback_";
const COMMENTS_MARKER: &str = "Feedback Comments:";

static COMMENT_LINE: OnceLock<Regex> = OnceLock::new();

fn comment_line() -> &'static Regex {
    COMMENT_LINE.get_or_init(|| {
        Regex::new(r"^\[(\d{1,2}):(\d{2})\]\s*(.+?)\s*(\(Resolved\)|\(Pending\))?$")
            .unwrap_or_else(|e| unreachable!("comment pattern: {e}"))
    })
}

/// `m:ss`
pub fn format_timestamp(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// A feedback report for one voice of a project.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackReport {
    pub project: String,
    pub voice: String,
    pub date: DateTime<Utc>,
    pub comments: Vec<FeedbackComment>,
}

impl FeedbackReport {
    pub fn render(&self) -> String {
        let mut comments: Vec<&FeedbackComment> = self.comments.iter().collect();
        comments.sort_by_key(|c| c.timestamp);

        let mut out = String::new();
        let _ = writeln!(out, "Voice Feedback Report");
        let _ = writeln!(out, "--------------------");
        let _ = writeln!(out, "Project: {}", self.project);
        let _ = writeln!(out, "Voice: {}", self.voice);
        let _ = writeln!(out, "Date: {}", self.date.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out);
        let _ = writeln!(out, "{COMMENTS_MARKER}");
        for c in comments {
            let status = if c.resolved { "(Resolved)" } else { "(Pending)" };
            let _ = writeln!(out, "[{}] {} {status}", format_timestamp(c.timestamp), c.comment);
        }
        out
    }

    /// Name the report is stored under.
    pub fn file_name(&self) -> String {
        feedback_file_name(&self.project, &self.voice, self.date)
    }
}

/// `feedback_{project}_{voice}_{timestamp}.txt`; the timestamp sorts
/// chronologically and contains no `:` or `.`.
pub fn feedback_file_name(project: &str, voice: &str, at: DateTime<Utc>) -> String {
    format!(
        "{FILE_PREFIX}{project}_{voice}_{}.txt",
        at.format("%Y-%m-%dT%H-%M-%S-%3fZ")
    )
}

/// Comments found after the `Feedback Comments:` marker.
///
/// Lines that do not look like `[m:ss] text (Resolved|Pending)` are skipped.
pub fn parse_feedback(text: &str) -> Vec<FeedbackComment> {
    text.lines()
        .skip_while(|line| !line.contains(COMMENTS_MARKER))
        .skip(1)
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let caps = comment_line().captures(line)?;
            let minutes: u32 = caps[1].parse().ok()?;
            let seconds: u32 = caps[2].parse().ok()?;
            Some(FeedbackComment {
                id: uuid::Uuid::new_v4().to_string(),
                timestamp: minutes * 60 + seconds,
                comment: caps[3].trim().to_string(),
                resolved: caps.get(4).is_some_and(|m| m.as_str() == "(Resolved)"),
            })
        })
        .collect()
}

/// Whether a report file name belongs to `voice`.
fn names_voice(file_name: &str, voice: &str) -> bool {
    let underscored = voice.split_whitespace().collect::<Vec<_>>().join("_");
    file_name.contains(&underscored)
        || file_name.contains(voice)
        || file_name.to_lowercase().contains(&voice.to_lowercase())
}

impl ProjectLibrary<'_> {
    /// Stores a rendered report for `voice`; returns the created file.
    pub async fn submit_feedback(&self, report: &FeedbackReport) -> Result<DriveItem, ProjectError> {
        let name = report.file_name();
        validate_file_name(&name)?;
        let segments = path_of(&[report.project.as_str(), Stage::Stage3.as_str(), FEEDBACK_FOLDER])?;

        let folder = self.resolver().resolve(&segments).await?;
        let item = self
            .store
            .write_content(&folder, &name, report.render().into_bytes(), "text/plain")
            .await?;
        info!(
            project = %report.project,
            voice = %report.voice,
            comments = report.comments.len(),
            file = %name,
            "feedback submitted"
        );
        Ok(item)
    }

    /// Comments of the most recent report for `voice`.
    ///
    /// Empty when the project has no matching report or the feedback folder
    /// cannot be read.
    pub async fn latest_feedback(
        &self,
        project: &str,
        voice: &str,
    ) -> Result<Vec<FeedbackComment>, ProjectError> {
        let folder_path = path_of(&[project, Stage::Stage3.as_str(), FEEDBACK_FOLDER])?;
        let Some(Some(folder)) =
            best_effort("feedback folder lookup", self.store.item_by_path(&folder_path)).await
        else {
            return Ok(Vec::new());
        };
        let handle = FolderHandle::from(&folder);
        let children = best_effort("feedback listing", self.store.list_children(&handle))
            .await
            .unwrap_or_default();

        let Some(latest) = children
            .into_iter()
            .filter(|item| item.is_file() && item.name.starts_with(FILE_PREFIX))
            .filter(|item| names_voice(&item.name, voice))
            .max_by(|a, b| a.name.cmp(&b.name))
        else {
            debug!(project, voice, "no feedback report");
            return Ok(Vec::new());
        };

        let mut file_path = folder_path;
        file_path.push(latest.name.clone());
        let Some(raw) = best_effort("feedback read", self.store.read_content(&file_path)).await
        else {
            return Ok(Vec::new());
        };
        debug!(project, voice, file = %latest.name, "loaded feedback report");
        Ok(parse_feedback(&String::from_utf8_lossy(&raw)))
    }
}
