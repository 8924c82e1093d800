use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::registry::ProcessRegistry;

// ─── Outer Message enum ───────────────────────────────────────────────────

/// The subset of `claude --output-format stream-json` events the task runner
/// understands. Discriminated by the JSON `"type"` field; any other type is
/// skipped by the reader.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    System(SystemMessage),
    Assistant(AssistantMessage),
    User(UserMessage),
    Result(ResultMessage),
}

impl Message {
    pub fn session_id(&self) -> Option<&str> {
        let id: &str = match self {
            Message::System(m) => &m.session_id,
            Message::Assistant(m) => &m.session_id,
            Message::User(m) => &m.session_id,
            Message::Result(m) => m.session_id(),
        };
        (!id.is_empty()).then_some(id)
    }
}

// ─── System messages ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemMessage {
    #[serde(default)]
    pub session_id: String,
    #[serde(flatten)]
    pub payload: SystemPayload,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum SystemPayload {
    Init(SystemInit),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SystemInit {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub cwd: String,
}

// ─── Assistant messages ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantMessage {
    pub message: AssistantContent,
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantContent {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// Content blocks within an assistant message.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        /// Tool inputs vary per tool.
        #[serde(default)]
        input: serde_json::Value,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(other)]
    Other,
}

// ─── User messages ────────────────────────────────────────────────────────

/// `type = "user"`: tool results fed back to the model.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserMessage {
    pub message: UserContent,
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserContent {
    #[serde(default)]
    pub content: UserBody,
}

/// The CLI echoes plain prompts as a bare string and tool results as blocks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UserBody {
    Text(String),
    Blocks(Vec<UserContentBlock>),
}

impl Default for UserBody {
    fn default() -> Self {
        UserBody::Blocks(Vec::new())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserContentBlock {
    Text {
        text: String,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<ToolResultBody>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
    #[serde(other)]
    Other,
}

/// Tool result payloads are either a plain string or a list of text blocks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ToolResultBody {
    Text(String),
    Blocks(Vec<ToolResultContent>),
}

impl ToolResultBody {
    pub fn text(&self) -> String {
        match self {
            ToolResultBody::Text(s) => s.clone(),
            ToolResultBody::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ToolResultContent::Text { text } => Some(text.as_str()),
                    ToolResultContent::Other => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResultContent {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

// ─── Result messages ──────────────────────────────────────────────────────

/// `type = "result"`: the terminal message of every run. Also the single
/// object printed by `--output-format json`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum ResultMessage {
    Success(ResultSuccess),
    ErrorDuringExecution(ResultError),
    ErrorMaxTurns(ResultError),
    ErrorMaxBudgetUsd(ResultError),
}

impl ResultMessage {
    pub fn session_id(&self) -> &str {
        match self {
            ResultMessage::Success(r) => &r.session_id,
            ResultMessage::ErrorDuringExecution(r)
            | ResultMessage::ErrorMaxTurns(r)
            | ResultMessage::ErrorMaxBudgetUsd(r) => &r.session_id,
        }
    }

    pub fn is_error(&self) -> bool {
        match self {
            ResultMessage::Success(r) => r.is_error,
            _ => true,
        }
    }

    /// The final result text. `None` for error subtypes.
    pub fn result_text(&self) -> Option<&str> {
        if let ResultMessage::Success(r) = self {
            Some(&r.result)
        } else {
            None
        }
    }

    /// Human-readable reason for an error subtype.
    pub fn error_summary(&self) -> Option<String> {
        match self {
            ResultMessage::Success(r) if r.is_error => Some(r.result.clone()),
            ResultMessage::Success(_) => None,
            ResultMessage::ErrorDuringExecution(r) => {
                Some(r.summary("error during execution"))
            }
            ResultMessage::ErrorMaxTurns(r) => Some(r.summary("maximum turns reached")),
            ResultMessage::ErrorMaxBudgetUsd(r) => Some(r.summary("budget exhausted")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultSuccess {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub num_turns: u32,
    #[serde(default)]
    pub total_cost_usd: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultError {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub num_turns: u32,
    #[serde(default)]
    pub total_cost_usd: f64,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ResultError {
    fn summary(&self, kind: &str) -> String {
        if self.errors.is_empty() {
            kind.to_string()
        } else {
            format!("{kind}: {}", self.errors.join("; "))
        }
    }
}

// ─── TaskOptions ──────────────────────────────────────────────────────────

/// Output format requested from the CLI (`--output-format`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    #[default]
    StreamJson,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::StreamJson => "stream-json",
        }
    }
}

/// Default wall-clock budget for a single task.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Default interval for synthetic "still working" updates.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(5);

/// Options for one external task.
#[derive(Debug, Clone)]
pub struct TaskOptions {
    /// Claude model name
    pub model: Option<String>,
    /// Tool names that are auto-approved (e.g. `WebSearch`)
    pub allowed_tools: Vec<String>,
    /// Maximum number of agentic turns
    pub max_turns: Option<u32>,
    /// Wall-clock limit; the subprocess is killed when it elapses
    pub timeout: Duration,
    /// Session ID to resume (`--resume`)
    pub resume: Option<String>,
    pub output_format: OutputFormat,
    /// Custom path to the `claude` binary (default: `"claude"`)
    pub path_to_executable: Option<String>,
    /// Arguments placed before the generated flags, e.g. when the CLI is
    /// launched through `npx` or a shell wrapper
    pub executable_args: Vec<String>,
    /// Working directory for the subprocess (default: current dir)
    pub cwd: Option<PathBuf>,
    /// Additional environment variables for the subprocess
    pub env: HashMap<String, String>,
    /// Interval after which a `Heartbeat` progress event is synthesized
    pub heartbeat: Duration,
    /// Registry tracking the spawned process (default: the global one)
    pub registry: Option<ProcessRegistry>,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            model: None,
            allowed_tools: Vec::new(),
            max_turns: None,
            timeout: DEFAULT_TIMEOUT,
            resume: None,
            output_format: OutputFormat::default(),
            path_to_executable: None,
            executable_args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            heartbeat: DEFAULT_HEARTBEAT,
            registry: None,
        }
    }
}

impl TaskOptions {
    pub fn executable(&self) -> &str {
        self.path_to_executable.as_deref().unwrap_or("claude")
    }
}
