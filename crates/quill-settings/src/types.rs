//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the JSON
//! file format. Each type implements [`Default`] with production default
//! values, and `#[serde(default)]` allows partial JSON so a settings file
//! can state only the values it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings type for the quill pipeline.
///
/// Loaded from `~/.quill/settings.json` with defaults applied for missing
/// fields. Environment variables can override specific values.
///
/// # JSON Format
///
/// All field names are camelCase. Example:
///
/// ```json
/// {
///   "vaultRoot": "~/notes",
///   "timing": { "debounceSeconds": 30 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuillSettings {
    /// Settings schema version.
    pub version: String,
    /// Root of the notes vault. Leading `~` expands to `$HOME`.
    pub vault_root: String,
    /// Flush and poll timing.
    pub timing: TimingSettings,
    /// Timeline rendering limits.
    pub timeline: TimelineSettings,
    /// Retention windows for pipeline-internal files.
    pub retention: RetentionSettings,
    /// Knowledge synthesis configuration.
    pub synthesis: SynthesisSettings,
    /// Path/prompt substrings that mark a session as pipeline-internal,
    /// excluded from materialization to avoid self-logging loops.
    pub recursion_markers: Vec<String>,
}

impl Default for QuillSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            vault_root: "~/vault".to_string(),
            timing: TimingSettings::default(),
            timeline: TimelineSettings::default(),
            retention: RetentionSettings::default(),
            synthesis: SynthesisSettings::default(),
            recursion_markers: vec![".quill".to_string()],
        }
    }
}

impl QuillSettings {
    /// The vault root with `~` expanded.
    #[must_use]
    pub fn vault_root_path(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.vault_root))
    }

    /// Pipeline-internal data directory inside the vault.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.vault_root_path().join(".quill")
    }

    /// Day-partitioned event log directory.
    #[must_use]
    pub fn queue_dir(&self) -> PathBuf {
        self.data_dir().join("queue")
    }

    /// Per-session aggregate directory. Session locks live here too.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.data_dir().join("state")
    }

    /// Per-document advisory lock directory.
    #[must_use]
    pub fn note_lock_dir(&self) -> PathBuf {
        self.data_dir().join("note_locks")
    }

    /// Worker log directory.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }
}

fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}

/// Flush and poll timing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimingSettings {
    /// Quiet period a session must accumulate before a non-terminal flush.
    pub debounce_seconds: u64,
    /// Daemon poll interval.
    pub poll_seconds: u64,
    /// How long to wait on a contended advisory lock before skipping.
    pub lock_timeout_seconds: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            debounce_seconds: 15,
            poll_seconds: 2,
            lock_timeout_seconds: 30,
        }
    }
}

/// Timeline rendering limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineSettings {
    /// Upper bound on rendered timeline entries; one extra elision line
    /// may appear when the timeline is compressed.
    pub max_entries: usize,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self { max_entries: 100 }
    }
}

/// Retention windows for pipeline-internal files. Notes themselves are
/// never subject to retention.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetentionSettings {
    /// Days to keep day-partitioned event log files.
    pub queue_keep_days: u64,
    /// Days to keep per-session aggregates and their lock files.
    pub state_keep_days: u64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            queue_keep_days: 7,
            state_keep_days: 30,
        }
    }
}

/// How session knowledge gets synthesized at terminal flushes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisMode {
    /// Timeline only; the summary block keeps its placeholder.
    Log,
    /// Run the configured extractor command and upsert its digest.
    Full,
}

/// Knowledge synthesis configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynthesisSettings {
    /// Synthesis mode.
    pub mode: SynthesisMode,
    /// Extractor program and arguments. Ignored in `log` mode; an empty
    /// command in `full` mode means no summaries are produced.
    pub command: Vec<String>,
    /// Extractor wall-clock budget.
    pub timeout_seconds: u64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            mode: SynthesisMode::Log,
            command: Vec::new(),
            timeout_seconds: 120,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
