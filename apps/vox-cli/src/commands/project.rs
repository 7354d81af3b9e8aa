use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use vox_projects::{ProjectLibrary, StageStatus, parse_stages};

use super::graph_store;
use crate::config::VoxConfig;
use crate::output::{human_size, print_output, print_success};

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// List projects, newest first.
    List,

    /// Create a project folder (no-op when it exists).
    Create {
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct FilesArgs {
    pub project: String,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    pub project: String,

    /// Folder path inside the project, e.g. `stage1/videos`.
    pub category_path: String,

    /// File name.
    pub name: String,
}

#[derive(Subcommand, Debug)]
pub enum StatusCommand {
    /// Print the stages of a project.
    Get { project: String },

    /// Replace the stages of a project with those in a JSON file.
    Set {
        project: String,

        /// File holding `{"stages": [...]}` or a bare stage array.
        file: PathBuf,
    },
}

pub async fn projects(cmd: ProjectCommand, config: &VoxConfig, json: bool) -> Result<()> {
    let store = graph_store(config)?;
    let library = ProjectLibrary::new(store.as_ref());
    match cmd {
        ProjectCommand::List => {
            let projects = library.list_projects().await?;
            print_output(&projects, json, |projects| {
                let mut out = String::new();
                for p in projects {
                    let created = p
                        .created_at
                        .map(|t| t.format("%Y-%m-%d").to_string())
                        .unwrap_or_default();
                    let _ = writeln!(out, "{:<40} {created}", p.name);
                }
                out.trim_end().to_string()
            });
        }
        ProjectCommand::Create { name } => {
            let project = library.create_project(&name).await?;
            print_output(&project, json, |p| format!("project {} ready", p.name));
        }
    }
    Ok(())
}

pub async fn files(args: FilesArgs, config: &VoxConfig, json: bool) -> Result<()> {
    let store = graph_store(config)?;
    let listing = ProjectLibrary::new(store.as_ref())
        .list_project_files(&args.project)
        .await?;
    print_output(&listing, json, |listing| {
        let mut out = String::new();
        for (folder, files) in listing.iter().filter(|(_, f)| !f.is_empty()) {
            let _ = writeln!(out, "{folder}:");
            for f in files {
                let _ = writeln!(out, "  {:<48} {:>10}", f.name, human_size(f.size));
            }
        }
        if out.is_empty() {
            "no files".to_string()
        } else {
            out.trim_end().to_string()
        }
    });
    Ok(())
}

pub async fn delete(args: DeleteArgs, config: &VoxConfig, json: bool) -> Result<()> {
    let store = graph_store(config)?;
    ProjectLibrary::new(store.as_ref())
        .delete_file(&args.project, &args.category_path, &args.name)
        .await?;
    print_success(
        &format!("deleted {}/{}/{}", args.project, args.category_path, args.name),
        json,
    );
    Ok(())
}

pub async fn status(cmd: StatusCommand, config: &VoxConfig, json: bool) -> Result<()> {
    let store = graph_store(config)?;
    let library = ProjectLibrary::new(store.as_ref());
    match cmd {
        StatusCommand::Get { project } => {
            let stages = library.get_status(&project).await?;
            print_output(&stages, json, |stages| {
                let mut out = String::new();
                for stage in stages {
                    let _ = writeln!(out, "{} [{}]", stage.title, stage.status);
                    for step in &stage.steps {
                        let _ = writeln!(out, "  - {} [{}]", step.title, step.status);
                    }
                }
                out.trim_end().to_string()
            });
        }
        StatusCommand::Set { project, file } => {
            let raw = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let stages = read_stages(&raw)?;
            library.set_status(&project, &stages).await?;
            print_success(&format!("saved {} stages for {project}", stages.len()), json);
        }
    }
    Ok(())
}

fn read_stages(raw: &[u8]) -> Result<Vec<StageStatus>> {
    parse_stages(raw).context("status file does not hold a stage list")
}
