//! `launchkit-agent` drives the Claude CLI as a time-boxed, non-interactive
//! subprocess for the launchkit wizard.
//!
//! # Architecture
//!
//! ```text
//! TaskOptions
//!     │
//!     ▼
//! ClaudeProcess    ← spawns `claude --print --output-format stream-json …`
//!     │               in its own process group, reads JSONL from stdout
//!     ▼
//! run_task         ← select! over output / deadline / heartbeat ticker
//!     │               classifies events into Progress callbacks
//!     ▼
//! TaskOutput       ← final answer (or raw output), sources, session id
//!
//! ProcessRegistry  ← every live pid; terminate_all() on cancel,
//!                    kill_all_now() from a panic hook
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use launchkit_agent::{run_task, TaskOptions};
//!
//! let opts = TaskOptions {
//!     allowed_tools: vec!["WebSearch".into()],
//!     ..Default::default()
//! };
//! let out = run_task("Suggest three product names", opts, |p| {
//!     eprintln!("{}", p.status);
//! })
//! .await?;
//! println!("{}", out.text);
//! ```

pub mod error;
pub mod probe;
pub mod registry;
pub mod task;
pub mod types;

pub(crate) mod process;

#[cfg(test)]
mod tests;

pub use error::AgentError;
pub use probe::{detect, CliInfo, PROBE_TIMEOUT};
pub use registry::{ProcessRegistry, Tracked};
pub use task::{extract_urls, run_task, Progress, ProgressKind, TaskOutput};
pub use types::{
    ContentBlock, Message, OutputFormat, ResultMessage, TaskOptions, DEFAULT_HEARTBEAT,
    DEFAULT_TIMEOUT,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, AgentError>;
