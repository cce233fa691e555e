//! Extractor implementations.
//!
//! The trait seam exists so the worker can be wired with a no-op extractor
//! in log-only mode and a subprocess-backed one in full mode, and so tests
//! can substitute a canned extractor without spawning anything.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use quill_state::SessionState;

use crate::pack::KnowledgePack;

/// Prompts longer than this are truncated before being handed to the
/// extractor command.
const PROMPT_CONTEXT_CHARS: usize = 500;

/// Distills a finished session into a [`KnowledgePack`].
///
/// Returning `None` means "no summary for this session" and is always a
/// valid outcome; implementations must not fail the flush.
#[async_trait]
pub trait KnowledgeExtractor: Send + Sync {
    /// Extract knowledge from a session, or `None` when nothing useful
    /// could be produced.
    async fn extract(&self, state: &SessionState) -> Option<KnowledgePack>;
}

/// Extractor for log-only mode: never produces a pack.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopExtractor;

#[async_trait]
impl KnowledgeExtractor for NoopExtractor {
    async fn extract(&self, _state: &SessionState) -> Option<KnowledgePack> {
        None
    }
}

/// Extractor that shells out to a configured command.
///
/// The command receives a session context document as JSON on stdin and
/// must print a [`KnowledgePack`] as JSON on stdout. Non-zero exit,
/// timeout, spawn failure, and unparseable output all degrade to `None`
/// with a warning.
#[derive(Clone, Debug)]
pub struct CommandExtractor {
    command: Vec<String>,
    timeout: Duration,
}

impl CommandExtractor {
    /// Create an extractor. `command` is the program followed by its
    /// arguments; an empty command yields an extractor that always
    /// returns `None`.
    #[must_use]
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    async fn run(&self, context: &Value) -> Option<KnowledgePack> {
        let (program, args) = self.command.split_first()?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| warn!(program, %err, "failed to spawn extractor"))
            .ok()?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(context).ok()?;
            if let Err(err) = stdin.write_all(&payload).await {
                warn!(%err, "failed to write extractor stdin");
                return None;
            }
            // Dropping stdin closes the pipe so the command sees EOF.
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                warn!(%err, "extractor wait failed");
                return None;
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "extractor timed out");
                return None;
            }
        };

        if !output.status.success() {
            warn!(status = ?output.status.code(), "extractor exited non-zero");
            return None;
        }

        match serde_json::from_slice::<KnowledgePack>(&output.stdout) {
            Ok(pack) if pack.is_empty() => {
                debug!("extractor produced an empty pack");
                None
            }
            Ok(pack) => Some(pack),
            Err(err) => {
                warn!(%err, "extractor output was not valid JSON");
                None
            }
        }
    }
}

#[async_trait]
impl KnowledgeExtractor for CommandExtractor {
    async fn extract(&self, state: &SessionState) -> Option<KnowledgePack> {
        self.run(&session_context(state)).await
    }
}

/// Build the context document an extractor command receives on stdin.
fn session_context(state: &SessionState) -> Value {
    let prompts: Vec<String> = state
        .events
        .iter()
        .filter(|e| e.event == "UserPromptSubmit")
        .map(|e| truncate_chars(&e.description, PROMPT_CONTEXT_CHARS))
        .collect();

    let mut tool_counts = serde_json::Map::new();
    for event in &state.events {
        if event.event.starts_with("PostToolUse") {
            let tag = tool_tag(&event.description);
            let entry = tool_counts.entry(tag).or_insert(json!(0));
            if let Some(n) = entry.as_u64() {
                *entry = json!(n + 1);
            }
        }
    }

    json!({
        "session_id": state.session_id,
        "cwd": state.cwd,
        "first_event_ts": state.first_event_ts,
        "last_event_ts": state.last_event_ts,
        "prompts": prompts,
        "tool_counts": Value::Object(tool_counts),
        "event_count": state.events.len(),
    })
}

fn tool_tag(description: &str) -> String {
    description
        .strip_prefix("**")
        .and_then(|rest| rest.find("**").map(|end| rest[..end].to_string()))
        .unwrap_or_else(|| "Other".to_string())
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
