use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;

use crate::{AgentError, Result};

/// A located, runnable CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliInfo {
    pub path: PathBuf,
    /// First line of `--version` output, e.g. `1.0.43 (Claude Code)`.
    pub version: String,
}

/// How long `--version` may take before the CLI is considered broken.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Locate `exe` on `PATH` (or as a literal path) and confirm it answers
/// `--version` within `limit`.
pub async fn detect(exe: &str, limit: Duration) -> Result<CliInfo> {
    let path = which::which(exe).map_err(|_| AgentError::NotInstalled(exe.to_string()))?;

    let mut cmd = Command::new(&path);
    cmd.arg("--version").env_remove("CLAUDECODE").kill_on_drop(true);

    let output = tokio::time::timeout(limit, cmd.output())
        .await
        .map_err(|_| AgentError::Timeout { after: limit })??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(AgentError::Process(format!(
            "{} --version failed: {stderr}",
            path.display()
        )));
    }

    let version = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
    tracing::debug!(path = %path.display(), %version, "CLI detected");
    Ok(CliInfo { path, version })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &std::path::Path, body: &str) -> PathBuf {
        let path = dir.join("fake-claude");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn reports_version_line() {
        let dir = tempfile::TempDir::new().unwrap();
        let exe = script(dir.path(), "echo '1.2.3 (Claude Code)'; echo extra");
        let info = detect(exe.to_str().unwrap(), PROBE_TIMEOUT).await.unwrap();
        assert_eq!(info.version, "1.2.3 (Claude Code)");
        assert_eq!(info.path, exe);
    }

    #[tokio::test]
    async fn failing_version_is_process_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let exe = script(dir.path(), "echo broken >&2; exit 1");
        let err = detect(exe.to_str().unwrap(), PROBE_TIMEOUT).await.unwrap_err();
        assert!(err.to_string().contains("broken"), "{err}");
    }

    #[tokio::test]
    async fn hanging_cli_times_out() {
        let dir = tempfile::TempDir::new().unwrap();
        let exe = script(dir.path(), "sleep 10");
        let err = detect(exe.to_str().unwrap(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn missing_cli_is_not_installed() {
        let err = detect("__launchkit_missing_cli__", PROBE_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::NotInstalled(_)));
    }
}
