use anyhow::Result;
use clap::Subcommand;

use crate::config::{VoxConfig, config_path};
use crate::output::{print_json, print_success};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration, secret masked.
    Show,

    /// Write the effective configuration (file plus environment) to the config file.
    Save,
}

pub fn config(cmd: ConfigCommand, config: &VoxConfig, json: bool) -> Result<()> {
    let path = config_path()?;
    match cmd {
        ConfigCommand::Show => {
            let mut shown = config.clone();
            if !shown.credentials.client_secret.is_empty() {
                shown.credentials.client_secret = "********".into();
            }
            if !json {
                eprintln!("# {}", path.display());
            }
            print_json(&shown);
        }
        ConfigCommand::Save => {
            config.save_to(&path)?;
            print_success(&format!("saved {}", path.display()), json);
        }
    }
    Ok(())
}
