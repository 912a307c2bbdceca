//! # chatgate-settings
//!
//! Configuration with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ChatgateSettings::default()`]
//! 2. **Settings file**: `~/.chatgate/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `MODEL_PROVIDER`, `OPENAI_API_KEY`, ... (highest priority)
//!
//! The binary applies CLI flags on top of the loaded value. The result is
//! passed explicitly to the gateway; there is no global settings singleton.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
