//! Typed settings and their built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Default team snapshot lifetime: one day.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 86_400;

/// Team baseline location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamSettings {
    /// Local directory holding `CLAUDE.md` and `languages/` (may start with `~/`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Repository label shown in the managed banner, e.g. "acme/standards"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Emit the managed banner and provenance markers (default: true)
    pub annotate: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self { annotate: true }
    }
}

/// Which language blocks to compose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageSettings {
    /// Detect languages from project marker files (default: true)
    pub auto_detect: bool,

    /// Always-on languages
    pub enabled: Vec<String>,

    /// Never-on languages; wins over detection and `enabled`
    pub disabled: Vec<String>,
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            auto_detect: true,
            enabled: Vec::new(),
            disabled: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Seconds before the team snapshot is refreshed from its source
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
        }
    }
}

/// Effective, typed settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub team: TeamSettings,
    pub output: OutputSettings,
    pub languages: LanguageSettings,
    pub cache: CacheSettings,
}

impl Settings {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "output": {
                "annotate": self.output.annotate
            },
            "languages": {
                "auto_detect": self.languages.auto_detect,
                "enabled": self.languages.enabled,
                "disabled": self.languages.disabled
            },
            "cache": {
                "ttl_seconds": self.cache.ttl_seconds
            }
        })
    }
}
