use crate::assistant::ClaudeAssistant;
use crate::cmd::{runtime, Globals};
use crate::terminal::ConsoleTerminal;
use crate::{cancel, integrations, output};
use anyhow::{bail, Context};
use clap::Args;
use launchkit_agent::{detect, ProcessRegistry, PROBE_TIMEOUT};
use launchkit_core::assistant::{Assistant, NoAssistant};
use launchkit_core::materialize::{materialize, MaterializeReport};
use launchkit_core::prompt::{Answer, Prompter, Prompts};
use launchkit_core::settings::Settings;
use launchkit_core::wizard::{Wizard, WizardOptions, WizardOutcome};
use launchkit_core::LaunchError;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct CreateArgs {
    /// Project name (skips the naming step)
    pub name: Option<String>,

    /// Do not use the claude CLI, even when it is installed
    #[arg(long)]
    pub skip_ai: bool,

    /// Skip competitor and name research
    #[arg(long)]
    pub skip_research: bool,

    /// Do not initialise a git repository
    #[arg(long)]
    pub skip_git: bool,

    /// Do not create a GitHub repository
    #[arg(long)]
    pub skip_github: bool,

    /// Accept the summary without asking
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Make the GitHub repository private
    #[arg(long)]
    pub private: bool,

    /// Directory the project folder is created in
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

pub fn run(globals: &Globals, args: CreateArgs) -> anyhow::Result<()> {
    let mut prompts = Prompts::new(ConsoleTerminal::new());
    if !prompts.terminal().is_interactive() {
        bail!("the wizard needs an interactive terminal");
    }

    let settings = globals.settings()?;
    let rt = runtime()?;
    let registry = ProcessRegistry::global();
    cancel::install(&rt, registry);

    let task_options = globals.task_options(&settings);
    let ai_available = !args.skip_ai && {
        let exe = task_options.executable().to_string();
        match rt.block_on(detect(&exe, PROBE_TIMEOUT)) {
            Ok(info) => {
                tracing::debug!(path = %info.path.display(), version = %info.version, "claude CLI found");
                true
            }
            Err(e) => {
                output::warn(&format!("AI features disabled: {e}"));
                false
            }
        }
    };

    let claude;
    let assistant: &dyn Assistant = if ai_available {
        claude = ClaudeAssistant::new(rt.handle().clone(), task_options);
        &claude
    } else {
        &NoAssistant
    };

    let opts = WizardOptions {
        ai_available,
        skip_research: args.skip_research,
        supplied_name: args.name.clone(),
        assume_yes: args.yes,
        base_dir: base_dir(&args, &settings),
    };

    let outcome = Wizard::new(&mut prompts, assistant, opts).run();
    let ctx = match outcome {
        Ok(WizardOutcome::Generate(ctx)) => ctx,
        Ok(WizardOutcome::Declined) => {
            eprintln!("Nothing generated.");
            return Ok(());
        }
        Err(LaunchError::Cancelled) => cancel::abort(&rt, registry),
        Err(e) => return Err(e).context("wizard failed"),
    };

    let out_dir = ctx
        .output_dir
        .clone()
        .context("wizard finished without an output directory")?;
    let report = materialize(&ctx, &out_dir)?;
    report_generation(&report);

    if !args.skip_git {
        match integrations::git_init(&out_dir) {
            Ok(()) => output::success("Initialised git repository"),
            Err(e) => output::warn(&format!("git setup skipped: {e:#}")),
        }
        if !args.skip_github {
            let private = args.private || settings.github_private();
            let ask = !args.yes;
            match github(&mut prompts, &settings, &out_dir, &ctx.name, private, ask) {
                Ok(()) => {}
                Err(LaunchError::Cancelled) => cancel::abort(&rt, registry),
                Err(e) => output::warn(&format!("GitHub setup skipped: {e}")),
            }
        }
    }

    next_steps(&out_dir);
    Ok(())
}

/// `--dir`, then the `projects_dir` setting, then the current directory.
fn base_dir(args: &CreateArgs, settings: &Settings) -> PathBuf {
    args.dir
        .clone()
        .or_else(|| settings.projects_dir())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn report_generation(report: &MaterializeReport) {
    if report.is_partial() {
        output::warn(&format!(
            "Project created at {} with {} module(s) missing:",
            report.output_path.display(),
            report.errors.len()
        ));
        for failure in &report.errors {
            eprintln!("  - {}: {}", failure.module, failure.message);
        }
    } else {
        output::success(&format!(
            "Created {} files in {}",
            report.files.len(),
            report.output_path.display()
        ));
    }
}

fn github(
    prompts: &mut Prompts<ConsoleTerminal>,
    settings: &Settings,
    dir: &Path,
    name: &str,
    private: bool,
    ask: bool,
) -> launchkit_core::Result<()> {
    if which::which("gh").is_err() {
        tracing::debug!("gh not found; skipping GitHub repository");
        return Ok(());
    }
    if ask {
        let visibility = if private { "private" } else { "public" };
        let message = format!("Create a {visibility} GitHub repository?");
        if prompts.confirm(&message, true, false)? != Answer::Value(true) {
            return Ok(());
        }
    }
    match integrations::github_create(dir, name, private, settings.github_token()) {
        Ok(url) if !url.is_empty() => output::success(&format!("Pushed to {url}")),
        Ok(_) => output::success("Pushed to GitHub"),
        Err(e) => output::warn(&format!("GitHub setup skipped: {e:#}")),
    }
    Ok(())
}

fn next_steps(dir: &Path) {
    output::heading("Next steps");
    eprintln!("  cd {}", dir.display());
    eprintln!("  cp .env.example .env.local");
    eprintln!("  npm install");
    eprintln!("  npm run dev");
}
