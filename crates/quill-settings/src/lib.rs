//! # quill-settings
//!
//! Configuration management with layered sources for the quill pipeline.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`QuillSettings::default()`]
//! 2. **User file** — `~/.quill/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `QUILL_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use quill_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("vault: {}", settings.vault_root_path().display());
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
