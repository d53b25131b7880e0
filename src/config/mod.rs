//! Configuration merge system
//!
//! Implements the 4-layer configuration merge:
//! 1. Built-in defaults
//! 2. User config (~/.config/staghorn/config.toml)
//! 3. Project config (.staghorn/config.toml)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::{
    CacheSettings, LanguageSettings, OutputSettings, Settings, TeamSettings,
    DEFAULT_CACHE_TTL_SECONDS,
};
pub use effective::{is_valid_language_id, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{deep_merge, merge_layers};
