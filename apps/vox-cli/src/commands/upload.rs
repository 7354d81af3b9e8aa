use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use vox_drive::DocumentStore;
use vox_projects::ProjectLibrary;
use vox_protocol::{
    CreateSessionRequest, CreateSessionResponse, DriveItem, ResumableSession, Stage,
};
use vox_upload::{UploadEvent, Uploader};

use super::graph_store;
use crate::config::VoxConfig;
use crate::output::{human_size, print_json, print_output};

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Local file to upload.
    pub file: PathBuf,

    #[arg(long)]
    pub project: String,

    /// Stage folder (`stage1`…`stage4` or `1`…`4`).
    #[arg(long, default_value = "stage1")]
    pub stage: Stage,

    /// Folder under the stage.
    #[arg(long, default_value = "videos")]
    pub category: String,

    /// Remote file name; the local name by default.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    #[arg(long)]
    pub project: String,

    #[arg(long, default_value = "stage1")]
    pub stage: Stage,

    #[arg(long, default_value = "videos")]
    pub category: String,

    /// Remote file name.
    pub file_name: String,

    /// Declared size in bytes.
    #[arg(long)]
    pub size: Option<u64>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Local file to stream.
    pub file: PathBuf,

    /// `uploadUrl` of an open session.
    #[arg(long)]
    pub url: String,
}

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to store.
    pub file: PathBuf,

    #[arg(long)]
    pub project: String,

    /// Stage folder; omitted for the legacy project layout.
    #[arg(long)]
    pub stage: Option<Stage>,

    /// Folder override; derived from the MIME type by default.
    #[arg(long)]
    pub folder: Option<String>,

    /// MIME type; guessed from the extension by default.
    #[arg(long)]
    pub mime: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadSummary {
    path: String,
    bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    item: Option<DriveItem>,
}

fn local_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("{} has no usable file name", path.display()))
}

async fn open(path: &Path) -> Result<(tokio::fs::File, u64)> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let size = file.metadata().await?.len();
    Ok((file, size))
}

/// Fires `cancel` on Ctrl-C; the chunk in flight still completes.
fn cancel_on_interrupt(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after the current chunk");
            cancel.cancel();
        }
    })
}

fn print_progress(percent: u8) {
    eprint!("\r{percent:>3}%");
    if percent == 100 {
        eprintln!();
    }
}

pub async fn upload(args: UploadArgs, config: &VoxConfig, json: bool) -> Result<()> {
    let store: Arc<dyn DocumentStore> = graph_store(config)?;
    let (file, size) = open(&args.file).await?;
    let request = CreateSessionRequest {
        project_name: args.project,
        stage: args.stage,
        file_name: match args.name {
            Some(name) => name,
            None => local_name(&args.file)?,
        },
        file_size: Some(size),
        category: args.category,
    };

    let mut uploader = Uploader::new(store, config.upload_options());
    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancel.clone());
    let printer = uploader.take_events().map(|mut events| {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    UploadEvent::SessionOpened { path } if !json => eprintln!("uploading to {path}"),
                    UploadEvent::Progress { percent, .. } if !json => print_progress(percent),
                    _ => {}
                }
            }
        })
    });

    let result = uploader.upload(&request, file, size, &cancel).await;
    drop(uploader);
    interrupt.abort();
    if let Some(printer) = printer {
        let _ = printer.await;
    }
    let outcome = result?;

    let summary = UploadSummary {
        path: outcome.path,
        bytes: outcome.bytes,
        item: outcome.item,
    };
    print_output(&summary, json, |s| {
        format!("uploaded {} ({})", s.path, human_size(s.bytes))
    });
    Ok(())
}

pub async fn session(args: SessionArgs, config: &VoxConfig) -> Result<()> {
    let store: Arc<dyn DocumentStore> = graph_store(config)?;
    let uploader = Uploader::new(store, config.upload_options());
    let request = CreateSessionRequest {
        project_name: args.project,
        stage: args.stage,
        file_name: args.file_name,
        file_size: args.size,
        category: args.category,
    };
    let session = uploader.create_session_for(&request).await?;
    print_json(&CreateSessionResponse::from(session));
    Ok(())
}

pub async fn send(args: SendArgs, config: &VoxConfig, json: bool) -> Result<()> {
    let store: Arc<dyn DocumentStore> = graph_store(config)?;
    let (file, size) = open(&args.file).await?;
    let uploader = Uploader::new(store, config.upload_options());
    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancel.clone());

    let session = ResumableSession::without_expiry(args.url.as_str());
    let result = uploader
        .upload_to_session(&session, file, size, &cancel, |percent| {
            if !json {
                print_progress(percent);
            }
        })
        .await;
    interrupt.abort();

    let summary = UploadSummary {
        path: args.url,
        bytes: size,
        item: result?,
    };
    print_output(&summary, json, |s| format!("sent {}", human_size(s.bytes)));
    Ok(())
}

pub async fn put(args: PutArgs, config: &VoxConfig, json: bool) -> Result<()> {
    let store = graph_store(config)?;
    let name = local_name(&args.file)?;
    let mime = match args.mime {
        Some(mime) => mime,
        None => guess_mime(&name).to_string(),
    };
    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let item = ProjectLibrary::new(store.as_ref())
        .upload_file(&args.project, args.stage, args.folder.as_deref(), &name, &mime, data)
        .await?;
    print_output(&item, json, |i| format!("stored {} ({})", i.name, human_size(i.size)));
    Ok(())
}

/// MIME type from a file extension.
fn guess_mime(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "rtf" => "application/rtf",
        _ => "application/octet-stream",
    }
}
