//! Subcommands of `vox`.

pub mod feedback;
pub mod project;
pub mod settings;
pub mod upload;
pub mod voices;

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use vox_drive::GraphStore;

use crate::config::VoxConfig;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a file in chunks into `project/stage/category`.
    Upload(upload::UploadArgs),

    /// Open a resumable upload session and print its URL.
    Session(upload::SessionArgs),

    /// Stream a file to an existing upload URL.
    Send(upload::SendArgs),

    /// Store a small file in one request, routed by MIME type.
    Put(upload::PutArgs),

    /// List or create projects.
    #[command(subcommand)]
    Projects(project::ProjectCommand),

    /// List the files of every stage folder of a project.
    Files(project::FilesArgs),

    /// Delete a file from a project.
    Delete(project::DeleteArgs),

    /// Read or write the workflow status of a project.
    #[command(subcommand)]
    Status(project::StatusCommand),

    /// Read or submit voice feedback reports.
    #[command(subcommand)]
    Feedback(feedback::FeedbackCommand),

    /// Ensure the stage 3 folder of a voice exists.
    VoiceFolder(feedback::VoiceFolderArgs),

    /// Copy a stage 2 voice file into its stage 3 folder.
    CopyVoice(feedback::CopyVoiceArgs),

    /// Manage the local voice catalog.
    #[command(subcommand)]
    Voices(voices::VoicesCommand),

    /// Show or save the configuration.
    #[command(subcommand)]
    Config(settings::ConfigCommand),
}

pub async fn run(command: Command, config: &VoxConfig, json: bool) -> Result<()> {
    match command {
        Command::Upload(args) => upload::upload(args, config, json).await,
        Command::Session(args) => upload::session(args, config).await,
        Command::Send(args) => upload::send(args, config, json).await,
        Command::Put(args) => upload::put(args, config, json).await,
        Command::Projects(cmd) => project::projects(cmd, config, json).await,
        Command::Files(args) => project::files(args, config, json).await,
        Command::Delete(args) => project::delete(args, config, json).await,
        Command::Status(cmd) => project::status(cmd, config, json).await,
        Command::Feedback(cmd) => feedback::feedback(cmd, config, json).await,
        Command::VoiceFolder(args) => feedback::voice_folder(args, config, json).await,
        Command::CopyVoice(args) => feedback::copy_voice(args, config, json).await,
        Command::Voices(cmd) => voices::voices(cmd, json),
        Command::Config(cmd) => settings::config(cmd, config, json),
    }
}

/// Graph client for the configured site.
pub(crate) fn graph_store(config: &VoxConfig) -> Result<Arc<GraphStore>> {
    config.require_remote()?;
    let store = GraphStore::new(config.credentials.clone(), &config.graph())?;
    Ok(Arc::new(store))
}
