//! Post-generation steps that shell out: git and the GitHub CLI.
//!
//! Both are best effort; the caller reports failures as warnings.

use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::process::Command;

fn tool(name: &str) -> anyhow::Result<PathBuf> {
    which::which(name).with_context(|| format!("'{name}' is not installed or not on PATH"))
}

/// Run `cmd` to completion; on failure the error carries its stderr.
fn run(mut cmd: Command, what: &str) -> anyhow::Result<String> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute {what}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{what} failed: {}", stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `git init`, stage everything, and make the first commit.
pub fn git_init(dir: &Path) -> anyhow::Result<()> {
    let git = tool("git")?;
    let step = |args: &[&str]| {
        let mut cmd = Command::new(&git);
        cmd.args(args).current_dir(dir);
        run(cmd, &format!("git {}", args[0]))
    };
    step(&["init", "-q"])?;
    step(&["add", "-A"])?;
    step(&["commit", "-q", "-m", "Initial commit from launchkit"])?;
    tracing::debug!(dir = %dir.display(), "git repository initialised");
    Ok(())
}

/// Create a GitHub repository from `dir` and push it. Returns what `gh`
/// printed, normally the repository URL.
pub fn github_create(
    dir: &Path,
    name: &str,
    private: bool,
    token: Option<&str>,
) -> anyhow::Result<String> {
    let gh = tool("gh")?;
    let mut cmd = Command::new(gh);
    cmd.args(["repo", "create", name])
        .arg(if private { "--private" } else { "--public" })
        .args(["--source", ".", "--push"])
        .current_dir(dir);
    if let Some(token) = token {
        cmd.env("GH_TOKEN", token);
    }
    run(cmd, "gh repo create")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_tool_is_reported_by_name() {
        let err = tool("launchkit-no-such-tool").unwrap_err();
        assert!(err.to_string().contains("launchkit-no-such-tool"));
    }

    #[test]
    fn failing_command_carries_stderr() {
        if which::which("sh").is_err() {
            return;
        }
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo boom >&2; exit 3"]);
        let err = run(cmd, "sh").unwrap_err();
        assert_eq!(err.to_string(), "sh failed: boom");
    }

    #[test]
    fn git_init_creates_repository() {
        if which::which("git").is_err() {
            return;
        }
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), "# acme\n").unwrap();
        // The commit needs an identity, which CI machines may lack.
        let _ = git_init(dir.path());
        assert!(dir.path().join(".git").is_dir());
    }
}
