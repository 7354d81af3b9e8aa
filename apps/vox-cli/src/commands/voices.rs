use std::fmt::Write as _;

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use vox_cache::{DEFAULT_CAPACITY, Voice, VoiceCatalog, VoiceKind};
use vox_protocol::Stage;

use crate::config::catalog_path;
use crate::output::{human_size, print_json, print_output, print_success};

#[derive(Subcommand, Debug)]
pub enum VoicesCommand {
    /// List cataloged voices.
    List(ListArgs),

    /// Add a voice to the catalog.
    Add(AddArgs),

    /// Remove a voice by id.
    Remove { id: String },

    /// Keep only the most recently uploaded voices.
    Prune {
        #[arg(long, default_value_t = 10)]
        keep: usize,
    },

    /// Show how much of the catalog capacity is used.
    Usage,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Uploaded voices of this project.
    #[arg(long)]
    pub project: Option<String>,

    /// With --project: AI voices generated for this stage.
    #[arg(long, requires = "project")]
    pub stage: Option<Stage>,

    /// Only base voices.
    #[arg(long, conflicts_with = "project")]
    pub base: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindArg {
    Base,
    Custom,
}

impl From<KindArg> for VoiceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Base => VoiceKind::Base,
            KindArg::Custom => VoiceKind::Custom,
        }
    }
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub title: String,

    #[arg(long, value_enum, default_value = "custom")]
    pub kind: KindArg,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Repeatable.
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    #[arg(long)]
    pub audio_url: Option<String>,

    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub stage: Option<Stage>,

    /// Mark as AI-generated.
    #[arg(long)]
    pub ai: bool,
}

fn describe(voices: &[&Voice]) -> String {
    if voices.is_empty() {
        return "no voices".into();
    }
    let mut out = String::new();
    for v in voices {
        let ai = if v.is_ai_voice { " [AI]" } else { "" };
        let _ = writeln!(
            out,
            "{}  {}{ai}  {}",
            v.id,
            v.title,
            v.upload_date.format("%Y-%m-%d %H:%M")
        );
    }
    out.trim_end().to_string()
}

pub fn voices(cmd: VoicesCommand, json: bool) -> Result<()> {
    let path = catalog_path()?;
    let mut catalog = VoiceCatalog::load(&path, DEFAULT_CAPACITY)?;

    match cmd {
        VoicesCommand::List(args) => {
            let selected: Vec<&Voice> = match (&args.project, args.stage) {
                (Some(project), Some(stage)) => catalog.ai_voices_for_stage(project, stage),
                (Some(project), None) => catalog.for_project(project),
                (None, _) if args.base => catalog.base_voices(),
                (None, _) => catalog.voices().collect(),
            };
            print_output(selected.as_slice(), json, describe);
            return Ok(());
        }
        VoicesCommand::Add(args) => {
            let mut voice = Voice::new(args.title, args.kind.into());
            voice.description = args.description;
            voice.tags = args.tags;
            voice.audio_url = args.audio_url;
            voice.project_id = args.project;
            voice.stage_id = args.stage;
            voice.is_ai_voice = args.ai;

            let evicted = catalog.add(voice.clone())?;
            for old in &evicted {
                eprintln!("evicted {} ({})", old.title, old.id);
            }
            print_output(&voice, json, |v| format!("added {} ({})", v.title, v.id));
        }
        VoicesCommand::Remove { id } => match catalog.remove(&id) {
            Some(voice) => print_success(&format!("removed {}", voice.title), json),
            None => anyhow::bail!("no voice with id {id}"),
        },
        VoicesCommand::Prune { keep } => {
            let dropped = catalog.prune_to(keep);
            print_success(&format!("dropped {dropped} voices"), json);
        }
        VoicesCommand::Usage => {
            let usage = catalog.usage();
            if json {
                print_json(&serde_json::json!({
                    "used": usage.used,
                    "capacity": usage.capacity,
                    "percent": usage.percent,
                    "voices": catalog.len(),
                }));
            } else {
                println!(
                    "{} voices, {} of {} ({:.1}%)",
                    catalog.len(),
                    human_size(usage.used as u64),
                    human_size(usage.capacity as u64),
                    usage.percent
                );
            }
            return Ok(());
        }
    }

    catalog.save(&path)?;
    Ok(())
}
