use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

use crate::types::{Message, OutputFormat, TaskOptions};
use crate::{AgentError, Result};

// ─── Line ─────────────────────────────────────────────────────────────────

/// One non-empty line of subprocess output.
#[derive(Debug)]
pub(crate) enum Line {
    /// A recognised stream-json event.
    Event(Message),
    /// Anything else: plain-text output or JSON of a type we do not model.
    Raw(String),
}

// ─── ClaudeProcess ────────────────────────────────────────────────────────

/// A running `claude --print …` subprocess.
///
/// The prompt is passed as an argument and stdin is closed, so the process
/// never waits for input. Stdout is read line by line; stderr is drained by a
/// background task and surfaced when the process exits with an error.
pub(crate) struct ClaudeProcess {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    /// Stderr output collected by a background reader task.
    stderr_buf: Arc<Mutex<String>>,
}

impl ClaudeProcess {
    /// Spawn the configured executable for `prompt`.
    ///
    /// `CLAUDECODE` is removed from the environment so this works both from a
    /// terminal and from inside a running Claude session.
    pub(crate) fn spawn(prompt: &str, opts: &TaskOptions) -> Result<Self> {
        let mut cmd = build_command(prompt, opts);
        cmd.env_remove("CLAUDECODE");

        for (k, v) in &opts.env {
            cmd.env(k, v);
        }

        Self::from_command(cmd).map_err(|e| match e {
            AgentError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                AgentError::NotInstalled(opts.executable().to_string())
            }
            other => other,
        })
    }

    fn from_command(mut cmd: Command) -> Result<Self> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group: terminal Ctrl-C reaches only us, and a kill
        // reaches the CLI's children too.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(AgentError::Io)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Process("stdout not captured".into()))?;

        let stderr_buf = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            let buf = Arc::clone(&stderr_buf);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    if let Ok(mut b) = buf.lock() {
                        if !b.is_empty() {
                            b.push('\n');
                        }
                        b.push_str(&line);
                    }
                }
            });
        }

        let lines = BufReader::new(stdout).lines();
        Ok(Self {
            child,
            lines,
            stderr_buf,
        })
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Read the next non-empty line from stdout.
    ///
    /// Lines that parse as a known [`Message`] become [`Line::Event`]; JSON of
    /// an unknown `type` (e.g. `rate_limit_event`) is skipped. Everything else
    /// is passed through as [`Line::Raw`] so plain-text output still reaches
    /// the caller. Returns `Ok(None)` on EOF.
    ///
    /// Cancel-safe: the only await point is `next_line`.
    pub(crate) async fn next_line(&mut self) -> Result<Option<Line>> {
        loop {
            match self.lines.next_line().await {
                Err(e) => return Err(AgentError::Io(e)),
                Ok(None) => return Ok(None),
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if !trimmed.starts_with('{') {
                        return Ok(Some(Line::Raw(line)));
                    }
                    match serde_json::from_str::<Message>(trimmed) {
                        Ok(msg) => return Ok(Some(Line::Event(msg))),
                        Err(_) if is_unknown_message_type(trimmed) => continue,
                        Err(_) => return Ok(Some(Line::Raw(line))),
                    }
                }
            }
        }
    }

    /// Wait for the child to exit and return an error if the exit code is
    /// non-zero or the process was killed by a signal. Captured stderr is
    /// included in the message.
    pub(crate) async fn wait_exit_error(&mut self) -> Option<AgentError> {
        let status = match self.child.wait().await {
            Ok(s) => s,
            Err(e) => return Some(AgentError::Io(e)),
        };

        if status.success() {
            return None;
        }

        let stderr = self.stderr();
        let head = match status.code() {
            Some(code) => format!("claude exited with code {code}"),
            None => "claude terminated by signal".to_string(),
        };
        let msg = if stderr.is_empty() {
            head
        } else {
            format!("{head}\nstderr: {stderr}")
        };

        Some(AgentError::Process(msg))
    }

    pub(crate) fn stderr(&self) -> String {
        self.stderr_buf
            .lock()
            .ok()
            .map(|b| b.trim().to_string())
            .unwrap_or_default()
    }

    /// Kill the subprocess group and reap the child (best-effort; errors are
    /// ignored).
    pub(crate) async fn kill(&mut self) {
        if let Some(pid) = self.child.id() {
            crate::registry::signal::kill(pid);
        }
        let _ = self.child.kill().await;
    }
}

/// Valid JSON carrying a `"type"` we don't model is an unknown event type,
/// not output.
fn is_unknown_message_type(line: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(line)
        .map(|v| v.get("type").is_some())
        .unwrap_or(false)
}

// ─── Command builder ──────────────────────────────────────────────────────

pub(crate) fn build_command(prompt: &str, opts: &TaskOptions) -> Command {
    let mut cmd = Command::new(opts.executable());
    cmd.args(&opts.executable_args);

    cmd.arg("--print")
        .arg("--output-format")
        .arg(opts.output_format.as_str());

    // stream-json requires --verbose in print mode
    if opts.output_format == OutputFormat::StreamJson {
        cmd.arg("--verbose");
    }

    if let Some(model) = &opts.model {
        cmd.arg("--model").arg(model);
    }

    if let Some(max_turns) = opts.max_turns {
        cmd.arg("--max-turns").arg(max_turns.to_string());
    }

    if !opts.allowed_tools.is_empty() {
        cmd.arg("--allowedTools").arg(opts.allowed_tools.join(","));
    }

    if let Some(resume) = &opts.resume {
        cmd.arg("--resume").arg(resume);
    }

    if let Some(cwd) = &opts.cwd {
        cmd.current_dir(cwd);
    }

    cmd.arg(prompt);
    cmd
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a: &OsStr| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn command_places_prompt_last() {
        let opts = TaskOptions {
            allowed_tools: vec!["WebSearch".into(), "WebFetch".into()],
            max_turns: Some(4),
            ..Default::default()
        };
        let cmd = build_command("find competitors", &opts);
        let argv = args(&cmd);
        assert_eq!(cmd.as_std().get_program(), "claude");
        assert_eq!(argv.last().map(String::as_str), Some("find competitors"));
        assert!(argv.contains(&"--print".to_string()));
        assert!(argv.contains(&"--verbose".to_string()));
        assert!(argv.windows(2).any(|w| w == ["--max-turns", "4"]));
        assert!(argv
            .windows(2)
            .any(|w| w == ["--allowedTools", "WebSearch,WebFetch"]));
    }

    #[test]
    fn command_includes_resume_and_leading_args() {
        let opts = TaskOptions {
            path_to_executable: Some("npx".into()),
            executable_args: vec!["@anthropic-ai/claude-code".into()],
            resume: Some("sess-1".into()),
            output_format: OutputFormat::Text,
            ..Default::default()
        };
        let cmd = build_command("hi", &opts);
        let argv = args(&cmd);
        assert_eq!(cmd.as_std().get_program(), "npx");
        assert_eq!(argv[0], "@anthropic-ai/claude-code");
        assert!(argv.windows(2).any(|w| w == ["--resume", "sess-1"]));
        assert!(argv.windows(2).any(|w| w == ["--output-format", "text"]));
        assert!(!argv.contains(&"--verbose".to_string()));
    }

    #[test]
    fn unknown_type_detection() {
        assert!(is_unknown_message_type(r#"{"type":"rate_limit_event"}"#));
        assert!(!is_unknown_message_type(r#"{"answer":42}"#));
        assert!(!is_unknown_message_type("not json"));
    }
}
