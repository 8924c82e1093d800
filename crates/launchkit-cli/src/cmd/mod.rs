pub mod config;
pub mod create;
pub mod deploy;
pub mod domain;
pub mod research;

use anyhow::Context;
use launchkit_agent::{TaskOptions, DEFAULT_TIMEOUT};
use launchkit_core::settings::{self, Settings};
use std::path::PathBuf;
use tokio::runtime::Runtime;

/// Options shared by every subcommand.
pub struct Globals {
    pub config: Option<PathBuf>,
    pub claude: Option<String>,
}

impl Globals {
    pub fn settings_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(p) => Ok(p.clone()),
            None => Ok(settings::default_path()?),
        }
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let path = self.settings_path()?;
        Settings::load(&path)
            .with_context(|| format!("failed to read settings from {}", path.display()))
    }

    /// Task options from the settings store; `--claude` wins over
    /// `claude_path`.
    pub fn task_options(&self, settings: &Settings) -> TaskOptions {
        TaskOptions {
            path_to_executable: self
                .claude
                .clone()
                .or_else(|| settings.claude_path().map(str::to_string)),
            model: settings.model().map(str::to_string),
            timeout: settings.ai_timeout().unwrap_or(DEFAULT_TIMEOUT),
            ..Default::default()
        }
    }
}

pub fn runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")
}
