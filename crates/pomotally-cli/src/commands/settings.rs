use std::path::PathBuf;

use clap::Subcommand;
use pomotally_core::{Config, Settings};

use super::{open_settings, CommandResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the current settings as JSON
    Show,
    /// Replace the settings with the contents of a JSON file
    Set {
        /// Path to a settings JSON file
        file: PathBuf,
    },
}

pub async fn run(action: SettingsAction) -> CommandResult {
    let config = Config::load()?;
    let store = open_settings(&config)?;

    match action {
        SettingsAction::Show => {
            let settings = store.get().await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Set { file } => {
            let content = std::fs::read_to_string(&file)?;
            let settings: Settings = serde_json::from_str(&content)?;
            store.set(&settings).await?;
            println!("ok");
        }
    }
    Ok(())
}
