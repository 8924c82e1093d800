//! Persistent user settings: a flat JSON object of known keys.
//!
//! The store lives at `~/.config/launchkit/config.json` unless the caller
//! passes another path. Values are kept as strings and validated per key on
//! `set`; typed accessors parse them on the way out.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LaunchError, Result};
use crate::io;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Secret,
    Bool,
    Seconds,
    Dir,
}

/// A setting the store accepts.
#[derive(Debug, Clone, Copy)]
pub struct SettingKey {
    pub name: &'static str,
    pub help: &'static str,
    kind: Kind,
}

impl SettingKey {
    pub fn is_secret(&self) -> bool {
        self.kind == Kind::Secret
    }
}

pub const KEYS: &[SettingKey] = &[
    SettingKey {
        name: "github_token",
        help: "token used when creating GitHub repositories",
        kind: Kind::Secret,
    },
    SettingKey {
        name: "vercel_token",
        help: "token passed to the Vercel CLI on deploy",
        kind: Kind::Secret,
    },
    SettingKey {
        name: "github_private",
        help: "create GitHub repositories as private (true/false)",
        kind: Kind::Bool,
    },
    SettingKey {
        name: "projects_dir",
        help: "directory new projects are created in",
        kind: Kind::Dir,
    },
    SettingKey {
        name: "claude_path",
        help: "path to the claude CLI",
        kind: Kind::Text,
    },
    SettingKey {
        name: "model",
        help: "model passed to the claude CLI",
        kind: Kind::Text,
    },
    SettingKey {
        name: "ai_timeout_secs",
        help: "time limit for each AI step, in seconds",
        kind: Kind::Seconds,
    },
];

pub fn lookup(name: &str) -> Option<&'static SettingKey> {
    KEYS.iter().find(|k| k.name == name)
}

/// `~/.config/launchkit/config.json`
pub fn default_path() -> Result<PathBuf> {
    let home = home::home_dir().ok_or(LaunchError::HomeNotFound)?;
    Ok(home.join(".config").join("launchkit").join("config.json"))
}

fn normalize(key: &SettingKey, raw: &str) -> Result<String> {
    let value = raw.trim();
    let invalid = |reason: &str| LaunchError::InvalidSetting {
        key: key.name.to_string(),
        reason: reason.to_string(),
    };
    if value.is_empty() {
        return Err(invalid("value is empty"));
    }
    match key.kind {
        Kind::Text | Kind::Secret | Kind::Dir => Ok(value.to_string()),
        Kind::Bool => match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok("true".to_string()),
            "false" | "no" | "0" | "off" => Ok("false".to_string()),
            _ => Err(invalid("expected true or false")),
        },
        Kind::Seconds => match value.parse::<u64>() {
            Ok(0) => Err(invalid("must be greater than zero")),
            Ok(n) => Ok(n.to_string()),
            Err(_) => Err(invalid("expected a whole number of seconds")),
        },
    }
}

/// Show the first and last few characters of a secret.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Settings {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl Settings {
    /// Load the store at `path`. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), keys = values.len(), "settings loaded");
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.values)?;
        io::atomic_write(&self.path, content.as_bytes())
    }

    pub fn set(&mut self, name: &str, raw: &str) -> Result<()> {
        let key = lookup(name).ok_or_else(|| LaunchError::UnknownSetting(name.to_string()))?;
        let value = normalize(key, raw)?;
        self.values.insert(key.name.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Remove `name`; returns whether it was set.
    pub fn unset(&mut self, name: &str) -> Result<bool> {
        let key = lookup(name).ok_or_else(|| LaunchError::UnknownSetting(name.to_string()))?;
        Ok(self.values.remove(key.name).is_some())
    }

    /// Every stored value in key order, secrets masked.
    pub fn list(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(k, v)| {
                let shown = match lookup(k) {
                    Some(key) if key.is_secret() => mask(v),
                    _ => v.clone(),
                };
                (k.clone(), shown)
            })
            .collect()
    }

    // ---- typed accessors ---------------------------------------------------

    pub fn github_token(&self) -> Option<&str> {
        self.get("github_token")
    }

    pub fn vercel_token(&self) -> Option<&str> {
        self.get("vercel_token")
    }

    pub fn github_private(&self) -> bool {
        self.get("github_private") == Some("true")
    }

    pub fn projects_dir(&self) -> Option<PathBuf> {
        self.get("projects_dir").map(expand_home)
    }

    pub fn claude_path(&self) -> Option<&str> {
        self.get("claude_path")
    }

    pub fn model(&self) -> Option<&str> {
        self.get("model")
    }

    pub fn ai_timeout(&self) -> Option<Duration> {
        self.get("ai_timeout_secs")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => home::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> Settings {
        Settings::load(&dir.path().join("config.json")).unwrap()
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        assert!(s.list().is_empty());
        assert!(!s.github_private());
    }

    #[test]
    fn set_save_reload() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);
        s.set("model", "sonnet").unwrap();
        s.set("github_private", "Yes").unwrap();
        s.set("ai_timeout_secs", "90").unwrap();
        s.save().unwrap();

        let again = store(&dir);
        assert_eq!(again.model(), Some("sonnet"));
        assert!(again.github_private());
        assert_eq!(again.ai_timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn unknown_key_rejected() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);
        let err = s.set("colour", "red").unwrap_err();
        assert!(matches!(err, LaunchError::UnknownSetting(k) if k == "colour"));
        assert!(s.unset("colour").is_err());
    }

    #[test]
    fn invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);
        assert!(s.set("ai_timeout_secs", "soon").is_err());
        assert!(s.set("ai_timeout_secs", "0").is_err());
        assert!(s.set("github_private", "maybe").is_err());
        assert!(s.set("model", "   ").is_err());
    }

    #[test]
    fn secrets_are_masked_in_list() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);
        s.set("github_token", "ghp_abcdefghijklmnop").unwrap();
        s.set("model", "opus").unwrap();
        let listed = s.list();
        assert_eq!(listed[0], ("github_token".into(), "ghp_…mnop".into()));
        assert_eq!(listed[1], ("model".into(), "opus".into()));
        assert_eq!(s.github_token(), Some("ghp_abcdefghijklmnop"));
    }

    #[test]
    fn short_secrets_fully_masked() {
        assert_eq!(mask("abc"), "***");
    }

    #[test]
    fn unset_reports_presence() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);
        s.set("claude_path", "/opt/claude").unwrap();
        assert!(s.unset("claude_path").unwrap());
        assert!(!s.unset("claude_path").unwrap());
    }
}
