use crate::cmd::Globals;
use crate::output;
use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::process::Command;

fn project_dir(dir: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let dir = match dir {
        Some(d) => d,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    if !dir.join("package.json").exists() {
        bail!(
            "{} does not look like a generated project (no package.json)",
            dir.display()
        );
    }
    Ok(dir)
}

fn vercel_args(prod: bool, token: Option<&str>) -> Vec<String> {
    let mut args = vec!["deploy".to_string(), "--yes".to_string()];
    if prod {
        args.push("--prod".into());
    }
    if let Some(t) = token {
        args.push("--token".into());
        args.push(t.into());
    }
    args
}

fn deploy(dir: &Path, prod: bool, token: Option<&str>) -> anyhow::Result<()> {
    let vercel = which::which("vercel")
        .context("the Vercel CLI is not installed (npm i -g vercel)")?;
    let status = Command::new(vercel)
        .args(vercel_args(prod, token))
        .current_dir(dir)
        .status()
        .context("failed to execute vercel")?;
    if !status.success() {
        bail!("vercel deploy exited with {}", status.code().unwrap_or(1));
    }
    Ok(())
}

pub fn run(globals: &Globals, dir: Option<PathBuf>, prod: bool) -> anyhow::Result<()> {
    let dir = project_dir(dir)?;
    let settings = globals.settings()?;
    deploy(&dir, prod, settings.vercel_token())?;
    let target = if prod { "production" } else { "preview" };
    output::success(&format!("Deployed {} to {target}", dir.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn requires_package_json() {
        let dir = TempDir::new().unwrap();
        let err = project_dir(Some(dir.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains("no package.json"));

        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(project_dir(Some(dir.path().to_path_buf())).unwrap(), dir.path());
    }

    #[test]
    fn args_include_prod_and_token() {
        assert_eq!(vercel_args(false, None), vec!["deploy", "--yes"]);
        assert_eq!(
            vercel_args(true, Some("tok")),
            vec!["deploy", "--yes", "--prod", "--token", "tok"]
        );
    }
}
