//! # pairchat-settings
//!
//! Configuration for the pairchat client, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`PairchatSettings::default()`]
//! 2. **User file**: `~/.pairchat/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `PAIRCHAT_*` overrides (highest priority)
//!
//! Command-line flags are applied by the binary on top of the result.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, default_data_dir, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::{ClientSettings, LoggingSettings, PairchatSettings, ServerSettings};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
