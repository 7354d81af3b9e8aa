use std::fmt::Write as _;

use anyhow::Result;
use clap::{Args, Subcommand};
use vox_projects::feedback::format_timestamp;
use vox_projects::{FeedbackReport, ProjectLibrary};
use vox_protocol::FeedbackComment;

use super::graph_store;
use crate::config::VoxConfig;
use crate::output::{human_size, print_output, print_success};

#[derive(Subcommand, Debug)]
pub enum FeedbackCommand {
    /// Print the latest feedback report of a voice.
    Show { project: String, voice: String },

    /// Submit a new feedback report for a voice.
    Submit {
        project: String,
        voice: String,

        /// `m:ss text`, optionally ending in `(Resolved)`. Repeatable.
        #[arg(long = "comment", required = true, value_parser = parse_comment)]
        comments: Vec<FeedbackComment>,
    },
}

#[derive(Args, Debug)]
pub struct VoiceFolderArgs {
    pub project: String,
    pub voice: String,
}

#[derive(Args, Debug)]
pub struct CopyVoiceArgs {
    pub project: String,
    pub voice: String,

    /// File name under `stage2/voices`.
    pub file: String,
}

/// Parses `m:ss text [(Resolved)|(Pending)]`.
fn parse_comment(raw: &str) -> Result<FeedbackComment, String> {
    let (time, text) = raw
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(|| format!("expected `m:ss comment`, got {raw:?}"))?;
    let (minutes, seconds) = time
        .split_once(':')
        .and_then(|(m, s)| Some((m.parse::<u32>().ok()?, s.parse::<u32>().ok()?)))
        .filter(|(_, s)| *s < 60)
        .ok_or_else(|| format!("invalid timestamp {time:?}, expected m:ss"))?;

    let text = text.trim();
    let (comment, resolved) = if let Some(c) = text.strip_suffix("(Resolved)") {
        (c, true)
    } else {
        (text.strip_suffix("(Pending)").unwrap_or(text), false)
    };
    let comment = comment.trim();
    if comment.is_empty() {
        return Err("comment text is empty".into());
    }
    Ok(FeedbackComment {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: minutes * 60 + seconds,
        comment: comment.to_string(),
        resolved,
    })
}

pub async fn feedback(cmd: FeedbackCommand, config: &VoxConfig, json: bool) -> Result<()> {
    let store = graph_store(config)?;
    let library = ProjectLibrary::new(store.as_ref());
    match cmd {
        FeedbackCommand::Show { project, voice } => {
            let comments = library.latest_feedback(&project, &voice).await?;
            print_output(&comments, json, |comments| {
                if comments.is_empty() {
                    return format!("no feedback for {voice}");
                }
                let mut out = String::new();
                for c in comments {
                    let state = if c.resolved { "resolved" } else { "pending" };
                    let _ = writeln!(out, "[{}] {} ({state})", format_timestamp(c.timestamp), c.comment);
                }
                out.trim_end().to_string()
            });
        }
        FeedbackCommand::Submit {
            project,
            voice,
            comments,
        } => {
            let report = FeedbackReport {
                project,
                voice,
                date: chrono::Utc::now(),
                comments,
            };
            let item = library.submit_feedback(&report).await?;
            print_output(&item, json, |i| format!("submitted {}", i.name));
        }
    }
    Ok(())
}

pub async fn voice_folder(args: VoiceFolderArgs, config: &VoxConfig, json: bool) -> Result<()> {
    let store = graph_store(config)?;
    let path = ProjectLibrary::new(store.as_ref())
        .create_voice_folder(&args.project, &args.voice)
        .await?;
    print_success(&path, json);
    Ok(())
}

pub async fn copy_voice(args: CopyVoiceArgs, config: &VoxConfig, json: bool) -> Result<()> {
    let store = graph_store(config)?;
    let item = ProjectLibrary::new(store.as_ref())
        .copy_voice(&args.project, &args.voice, &args.file)
        .await?;
    print_output(&item, json, |i| format!("copied {} ({})", i.name, human_size(i.size)));
    Ok(())
}
