use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::time::{Instant, MissedTickBehavior};

use crate::process::{ClaudeProcess, Line};
use crate::registry::ProcessRegistry;
use crate::types::{ContentBlock, Message, TaskOptions, UserBody, UserContentBlock};
use crate::{AgentError, Result};

// ─── Progress ─────────────────────────────────────────────────────────────

/// What a progress update is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressKind {
    /// The assistant invoked a web search.
    Search,
    /// The assistant invoked some other tool.
    Tool,
    /// A tool result contained source URLs not seen before in this task.
    Sources,
    /// Free-form status text.
    Status,
    /// Synthetic "still working" tick; no real event arrived recently.
    Heartbeat,
    /// The final answer was parsed.
    Finished,
}

/// A progress update delivered to the caller's callback. Counters are
/// cumulative for the whole task.
#[derive(Debug, Clone)]
pub struct Progress {
    pub kind: ProgressKind,
    pub status: String,
    pub searches: u32,
    pub sources: usize,
    pub elapsed: Duration,
}

// ─── TaskOutput ───────────────────────────────────────────────────────────

/// The outcome of a completed external task.
#[derive(Debug, Clone, Default)]
pub struct TaskOutput {
    /// The final answer, or the accumulated output when no result event was
    /// emitted.
    pub text: String,
    pub session_id: Option<String>,
    /// Distinct source URLs seen in tool results, in discovery order.
    pub sources: Vec<String>,
    pub searches: u32,
}

// ─── Event classification ─────────────────────────────────────────────────

/// A classified stream event.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TaskEvent {
    ToolUse { name: String, detail: Option<String> },
    ToolResult { urls: Vec<String> },
    Text(String),
    Final { text: String, is_error: bool },
}

fn url_pattern() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(r#"https?://[^\s"'<>()\[\]{},\\]+"#).expect("static regex is valid")
    })
}

/// Extract URLs from free text, trimming trailing punctuation.
pub fn extract_urls(text: &str) -> Vec<String> {
    url_pattern()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ';', ':']).to_string())
        .collect()
}

pub(crate) fn classify(msg: &Message) -> Vec<TaskEvent> {
    match msg {
        Message::System(_) => Vec::new(),
        Message::Assistant(a) => a
            .message
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { name, input, .. } => Some(TaskEvent::ToolUse {
                    name: name.clone(),
                    detail: tool_detail(input),
                }),
                ContentBlock::Text { text } if !text.trim().is_empty() => {
                    Some(TaskEvent::Text(text.clone()))
                }
                _ => None,
            })
            .collect(),
        Message::User(u) => match &u.message.content {
            UserBody::Text(_) => Vec::new(),
            UserBody::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    UserContentBlock::ToolResult {
                        content: Some(body),
                        ..
                    } => Some(TaskEvent::ToolResult {
                        urls: extract_urls(&body.text()),
                    }),
                    _ => None,
                })
                .collect(),
        },
        Message::Result(r) => vec![TaskEvent::Final {
            text: match r.result_text() {
                Some(t) => t.to_string(),
                None => r.error_summary().unwrap_or_default(),
            },
            is_error: r.is_error(),
        }],
    }
}

/// The most descriptive scalar in a tool input (search query, URL, path).
fn tool_detail(input: &serde_json::Value) -> Option<String> {
    ["query", "url", "pattern", "file_path", "command"]
        .iter()
        .find_map(|k| input.get(*k).and_then(|v| v.as_str()))
        .map(str::to_string)
}

fn is_search_tool(name: &str) -> bool {
    name.eq_ignore_ascii_case("websearch") || name.eq_ignore_ascii_case("web_search")
}

// ─── Tracker ──────────────────────────────────────────────────────────────

/// Folds classified events into cumulative counters and progress updates.
#[derive(Debug)]
pub(crate) struct Tracker {
    started: Instant,
    last_progress: Instant,
    searches: u32,
    seen: HashSet<String>,
    sources: Vec<String>,
    text: String,
    final_answer: Option<(String, bool)>,
    session_id: Option<String>,
}

impl Tracker {
    pub(crate) fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_progress: now,
            searches: 0,
            seen: HashSet::new(),
            sources: Vec::new(),
            text: String::new(),
            final_answer: None,
            session_id: None,
        }
    }

    fn progress(&mut self, kind: ProgressKind, status: String) -> Progress {
        self.last_progress = Instant::now();
        Progress {
            kind,
            status,
            searches: self.searches,
            sources: self.sources.len(),
            elapsed: self.started.elapsed(),
        }
    }

    pub(crate) fn observe(&mut self, msg: &Message) -> Vec<Progress> {
        if self.session_id.is_none() {
            self.session_id = msg.session_id().map(str::to_string);
        }
        let mut out = Vec::new();
        for event in classify(msg) {
            match event {
                TaskEvent::ToolUse { name, detail } => {
                    if is_search_tool(&name) {
                        self.searches += 1;
                        let status = match detail {
                            Some(q) => format!("Searching: {q}"),
                            None => "Searching the web".to_string(),
                        };
                        out.push(self.progress(ProgressKind::Search, status));
                    } else {
                        let status = match detail {
                            Some(d) => format!("{name}: {d}"),
                            None => name,
                        };
                        out.push(self.progress(ProgressKind::Tool, status));
                    }
                }
                TaskEvent::ToolResult { urls } => {
                    let fresh: Vec<String> = urls
                        .into_iter()
                        .filter(|u| self.seen.insert(u.clone()))
                        .collect();
                    if !fresh.is_empty() {
                        let n = fresh.len();
                        self.sources.extend(fresh);
                        out.push(self.progress(
                            ProgressKind::Sources,
                            format!("Found {n} new source(s)"),
                        ));
                    }
                }
                TaskEvent::Text(text) => {
                    self.push_text(&text);
                    let first = text.lines().next().unwrap_or("").trim().to_string();
                    out.push(self.progress(ProgressKind::Status, first));
                }
                TaskEvent::Final { text, is_error } => {
                    self.final_answer = Some((text, is_error));
                    out.push(self.progress(ProgressKind::Finished, "Done".to_string()));
                }
            }
        }
        out
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(text);
    }

    /// A heartbeat is due when nothing real happened within `interval`.
    pub(crate) fn heartbeat_due(&self, interval: Duration) -> bool {
        self.last_progress.elapsed() >= interval
    }

    /// Heartbeats do not count as progress; they keep firing for as long as
    /// the task stays silent.
    pub(crate) fn heartbeat(&self) -> Progress {
        let elapsed = self.started.elapsed();
        Progress {
            kind: ProgressKind::Heartbeat,
            status: format!("Still working ({}s)", elapsed.as_secs()),
            searches: self.searches,
            sources: self.sources.len(),
            elapsed,
        }
    }

    fn into_output(self, text: String) -> TaskOutput {
        TaskOutput {
            text,
            session_id: self.session_id,
            sources: self.sources,
            searches: self.searches,
        }
    }
}

// ─── run_task ─────────────────────────────────────────────────────────────

/// Run one non-interactive task against the `claude` CLI.
///
/// Three things happen concurrently until the process finishes: output is
/// read and classified line by line (each classified event is reported to
/// `on_progress` synchronously), a deadline enforces `opts.timeout`, and a
/// ticker synthesizes [`ProgressKind::Heartbeat`] updates when no real event
/// arrived within `opts.heartbeat`.
///
/// The subprocess is tracked in `opts.registry` (default: the global
/// registry) for its whole lifetime.
///
/// # Errors
///
/// - [`AgentError::Timeout`] when the deadline elapses; the process is killed
///   before returning.
/// - [`AgentError::Process`] when the process exits non-zero without a final
///   answer, or the final answer is an error result.
/// - [`AgentError::NotInstalled`] when the executable cannot be found.
pub async fn run_task<F>(prompt: &str, opts: TaskOptions, mut on_progress: F) -> Result<TaskOutput>
where
    F: FnMut(Progress),
{
    let registry = opts
        .registry
        .clone()
        .unwrap_or_else(|| ProcessRegistry::global().clone());

    let mut process = ClaudeProcess::spawn(prompt, &opts)?;
    let _tracked = process.pid().map(|pid| registry.track(pid));
    tracing::debug!(
        pid = process.pid(),
        timeout_ms = opts.timeout.as_millis() as u64,
        "external task started"
    );

    let mut tracker = Tracker::new();

    let deadline = tokio::time::sleep(opts.timeout);
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval_at(Instant::now() + opts.heartbeat, opts.heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            line = process.next_line() => match line {
                Err(e) => {
                    process.kill().await;
                    return Err(e);
                }
                Ok(None) => break,
                Ok(Some(Line::Event(msg))) => {
                    for p in tracker.observe(&msg) {
                        on_progress(p);
                    }
                    if tracker.final_answer.is_some() {
                        break;
                    }
                }
                Ok(Some(Line::Raw(text))) => tracker.push_text(&text),
            },
            _ = &mut deadline => {
                tracing::warn!(pid = process.pid(), "external task timed out; killing");
                process.kill().await;
                return Err(AgentError::Timeout { after: opts.timeout });
            }
            _ = ticker.tick() => {
                if tracker.heartbeat_due(opts.heartbeat) {
                    on_progress(tracker.heartbeat());
                }
            }
        }
    }

    if let Some((text, is_error)) = tracker.final_answer.take() {
        // The result event is terminal; don't wait for a lingering process.
        process.kill().await;
        if is_error {
            return Err(AgentError::Process(text));
        }
        return Ok(tracker.into_output(text));
    }

    // EOF without a result event: the exit status decides.
    let exit = tokio::select! {
        exit = process.wait_exit_error() => exit,
        _ = &mut deadline => {
            process.kill().await;
            return Err(AgentError::Timeout { after: opts.timeout });
        }
    };
    if let Some(err) = exit {
        return Err(err);
    }

    let raw = tracker.text.trim().to_string();
    if raw.is_empty() {
        let stderr = process.stderr();
        return Err(AgentError::Process(if stderr.is_empty() {
            "claude produced no output".to_string()
        } else {
            format!("claude produced no output\nstderr: {stderr}")
        }));
    }
    Ok(tracker.into_output(raw))
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Run `script` through `sh -c` in place of the real CLI. The generated
    /// flags and prompt become positional parameters the script ignores.
    fn scripted(script: &str, timeout: Duration, registry: &ProcessRegistry) -> TaskOptions {
        TaskOptions {
            path_to_executable: Some("sh".into()),
            executable_args: vec!["-c".into(), script.into(), "claude".into()],
            timeout,
            heartbeat: Duration::from_millis(100),
            registry: Some(registry.clone()),
            ..Default::default()
        }
    }

    const INIT: &str = r#"{"type":"system","subtype":"init","session_id":"s1","model":"m","tools":[],"cwd":"/tmp"}"#;
    const SEARCH: &str = r#"{"type":"assistant","session_id":"s1","message":{"content":[{"type":"tool_use","id":"t1","name":"WebSearch","input":{"query":"saas invoicing"}}]}}"#;
    const RESULTS: &str = r#"{"type":"user","session_id":"s1","message":{"content":[{"type":"tool_result","tool_use_id":"t1","content":"Links: [{\"url\":\"https://a.example.com/x\"},{\"url\":\"https://b.example.com\"}]"}]}}"#;
    const RESULTS_AGAIN: &str = r#"{"type":"user","session_id":"s1","message":{"content":[{"type":"tool_result","tool_use_id":"t2","content":[{"type":"text","text":"see https://a.example.com/x and https://c.example.com"}]}]}}"#;
    const FINAL: &str = r#"{"type":"result","subtype":"success","session_id":"s1","result":"{\"ok\":true}","is_error":false,"num_turns":2,"total_cost_usd":0.01}"#;

    fn echo_lines(lines: &[&str]) -> String {
        lines
            .iter()
            .map(|l| format!("printf '%s\\n' '{}'", l.replace('\'', "'\\''")))
            .collect::<Vec<_>>()
            .join("; ")
    }

    #[tokio::test]
    async fn stream_is_classified_and_sources_deduplicated() {
        let registry = ProcessRegistry::new();
        let script = echo_lines(&[INIT, SEARCH, RESULTS, RESULTS_AGAIN, FINAL]);
        let mut events = Vec::new();
        let out = run_task("p", scripted(&script, Duration::from_secs(10), &registry), |p| {
            events.push(p)
        })
        .await
        .unwrap();

        assert_eq!(out.text, r#"{"ok":true}"#);
        assert_eq!(out.session_id.as_deref(), Some("s1"));
        assert_eq!(out.searches, 1);
        assert_eq!(
            out.sources,
            vec![
                "https://a.example.com/x",
                "https://b.example.com",
                "https://c.example.com"
            ]
        );
        assert!(events
            .iter()
            .any(|p| p.kind == ProgressKind::Search && p.status.contains("saas invoicing")));
        let source_events: Vec<_> = events
            .iter()
            .filter(|p| p.kind == ProgressKind::Sources)
            .collect();
        assert_eq!(source_events.len(), 2);
        assert_eq!(source_events[1].sources, 3);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn final_answer_preferred_over_raw_output() {
        let registry = ProcessRegistry::new();
        let script = format!("echo 'warming up'; {}", echo_lines(&[FINAL]));
        let out = run_task("p", scripted(&script, Duration::from_secs(10), &registry), |_| {})
            .await
            .unwrap();
        assert_eq!(out.text, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn plain_text_output_is_used_when_no_result_event() {
        let registry = ProcessRegistry::new();
        let out = run_task(
            "p",
            scripted("echo 'line one'; echo 'line two'", Duration::from_secs(10), &registry),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(out.text, "line one\nline two");
    }

    #[tokio::test]
    async fn nonzero_exit_includes_stderr() {
        let registry = ProcessRegistry::new();
        let err = run_task(
            "p",
            scripted("echo 'auth required' >&2; exit 3", Duration::from_secs(10), &registry),
            |_| {},
        )
        .await
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("code 3"), "{msg}");
        assert!(msg.contains("auth required"), "{msg}");
    }

    #[tokio::test]
    async fn error_result_is_an_error() {
        let registry = ProcessRegistry::new();
        let line = r#"{"type":"result","subtype":"error_max_turns","session_id":"s","errors":["turn limit"]}"#;
        let err = run_task(
            "p",
            scripted(&echo_lines(&[line]), Duration::from_secs(10), &registry),
            |_| {},
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("turn limit"));
    }

    #[tokio::test]
    async fn timeout_kills_process_within_bound() {
        let registry = ProcessRegistry::new();
        let started = std::time::Instant::now();
        let err = run_task(
            "p",
            scripted("sleep 30", Duration::from_millis(2000), &registry),
            |_| {},
        )
        .await
        .unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.is_timeout(), "{err}");
        assert!(elapsed >= Duration::from_millis(2000));
        assert!(elapsed < Duration::from_millis(2500), "{elapsed:?}");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn heartbeat_emitted_while_silent() {
        let registry = ProcessRegistry::new();
        let script = format!("sleep 0.5; {}", echo_lines(&[FINAL]));
        let mut beats = 0;
        run_task("p", scripted(&script, Duration::from_secs(10), &registry), |p| {
            if p.kind == ProgressKind::Heartbeat {
                beats += 1;
            }
        })
        .await
        .unwrap();
        assert!(beats >= 2, "expected heartbeats, got {beats}");
    }

    #[tokio::test]
    async fn terminate_all_cancels_outstanding_task() {
        let registry = ProcessRegistry::new();
        let opts = scripted("sleep 30", Duration::from_secs(60), &registry);
        let task = tokio::spawn(async move { run_task("p", opts, |_| {}).await });

        let wait_start = std::time::Instant::now();
        while registry.is_empty() {
            assert!(wait_start.elapsed() < Duration::from_secs(5), "never tracked");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        registry.terminate_all(Duration::from_millis(500)).await;
        assert!(registry.is_empty());

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("task should finish once its process is gone")
            .unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_executable_is_not_installed() {
        let opts = TaskOptions {
            path_to_executable: Some("__launchkit_missing_cli__".into()),
            registry: Some(ProcessRegistry::new()),
            ..Default::default()
        };
        let err = run_task("p", opts, |_| {}).await.unwrap_err();
        assert!(matches!(err, AgentError::NotInstalled(_)));
    }

    #[test]
    fn extract_urls_trims_punctuation() {
        let urls = extract_urls("See https://x.dev/a. Also (https://y.dev/b), done");
        assert_eq!(urls, vec!["https://x.dev/a", "https://y.dev/b"]);
    }
}
