use crate::cmd::Globals;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use launchkit_core::settings::KEYS;
use launchkit_core::LaunchError;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Store a value
    Set { key: String, value: String },

    /// Print a stored value
    Get { key: String },

    /// Remove a stored value
    Unset { key: String },

    /// List stored values (secrets are masked)
    List {
        /// Output as JSON
        #[arg(long, short = 'j')]
        json: bool,
    },

    /// Print the settings file location
    Path,

    /// Describe every supported key
    Keys,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(globals: &Globals, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Set { key, value } => {
            let mut settings = globals.settings()?;
            settings.set(&key, &value)?;
            settings
                .save()
                .with_context(|| format!("failed to write {}", settings.path().display()))?;
            println!("{key} saved");
            Ok(())
        }
        ConfigSubcommand::Get { key } => {
            let settings = globals.settings()?;
            if launchkit_core::settings::lookup(&key).is_none() {
                return Err(LaunchError::UnknownSetting(key).into());
            }
            let value = settings
                .get(&key)
                .with_context(|| format!("'{key}' is not set"))?;
            println!("{value}");
            Ok(())
        }
        ConfigSubcommand::Unset { key } => {
            let mut settings = globals.settings()?;
            if settings.unset(&key)? {
                settings.save()?;
                println!("{key} removed");
            } else {
                println!("{key} was not set");
            }
            Ok(())
        }
        ConfigSubcommand::List { json } => {
            let listed = globals.settings()?.list();
            if json {
                let map: BTreeMap<String, String> = listed.into_iter().collect();
                return print_json(&map);
            }
            if listed.is_empty() {
                println!("No settings stored.");
                return Ok(());
            }
            let rows = listed.into_iter().map(|(k, v)| vec![k, v]).collect();
            print_table(&["KEY", "VALUE"], rows);
            Ok(())
        }
        ConfigSubcommand::Path => {
            println!("{}", globals.settings_path()?.display());
            Ok(())
        }
        ConfigSubcommand::Keys => {
            let rows = KEYS
                .iter()
                .map(|k| vec![k.name.to_string(), k.help.to_string()])
                .collect();
            print_table(&["KEY", "DESCRIPTION"], rows);
            Ok(())
        }
    }
}
