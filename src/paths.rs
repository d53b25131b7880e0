//! Standard on-disk layout
//!
//! User-level files live under `~/.config/staghorn` (or `$STAGHORN_HOME`),
//! the team snapshot under `~/.cache/staghorn`, and the global output in
//! `~/.claude/CLAUDE.md`. Project-level files live under `<project>/.staghorn`.

use std::path::{Path, PathBuf};

/// Name of the merged output file
pub const OUTPUT_FILE: &str = "CLAUDE.md";

/// Errors resolving the layout
#[derive(Debug, thiserror::Error)]
pub enum PathsError {
    #[error("HOME environment variable not set")]
    NoHome,
}

/// User-level layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub home: PathBuf,
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub claude_dir: PathBuf,
}

impl Paths {
    /// Resolve from `HOME`, honoring `STAGHORN_HOME`, `XDG_CONFIG_HOME` and
    /// `XDG_CACHE_HOME`.
    pub fn from_env() -> Result<Self, PathsError> {
        let home = std::env::var("HOME").map_err(|_| PathsError::NoHome)?;
        let mut paths = Self::rooted(Path::new(&home));

        if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            if !dir.is_empty() {
                paths.config_dir = PathBuf::from(dir).join("staghorn");
            }
        }
        if let Ok(dir) = std::env::var("XDG_CACHE_HOME") {
            if !dir.is_empty() {
                paths.cache_dir = PathBuf::from(dir).join("staghorn");
            }
        }
        if let Ok(dir) = std::env::var("STAGHORN_HOME") {
            if !dir.is_empty() {
                paths.config_dir = PathBuf::from(dir);
            }
        }
        Ok(paths)
    }

    /// Default layout under an explicit home directory
    pub fn rooted(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
            config_dir: home.join(".config/staghorn"),
            cache_dir: home.join(".cache/staghorn"),
            claude_dir: home.join(".claude"),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Personal layer
    pub fn personal_file(&self) -> PathBuf {
        self.config_dir.join("personal.md")
    }

    pub fn personal_languages_dir(&self) -> PathBuf {
        self.config_dir.join("languages")
    }

    /// Snapshot of the team source
    pub fn team_cache_dir(&self) -> PathBuf {
        self.cache_dir.join("team")
    }

    /// Digests of outputs staghorn has written
    pub fn output_ledger(&self) -> PathBuf {
        self.cache_dir.join("outputs.json")
    }

    /// Global merged output (team + personal)
    pub fn global_output(&self) -> PathBuf {
        self.claude_dir.join(OUTPUT_FILE)
    }

    /// Expand a leading `~/` against this layout's home
    pub fn expand(&self, path: &str) -> PathBuf {
        if path == "~" {
            return self.home.clone();
        }
        match path.strip_prefix("~/") {
            Some(rest) => self.home.join(rest),
            None => PathBuf::from(path),
        }
    }
}

/// Project-level layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn staghorn_dir(&self) -> PathBuf {
        self.root.join(".staghorn")
    }

    pub fn config_file(&self) -> PathBuf {
        self.staghorn_dir().join("config.toml")
    }

    /// Project layer
    pub fn project_file(&self) -> PathBuf {
        self.staghorn_dir().join("project.md")
    }

    pub fn languages_dir(&self) -> PathBuf {
        self.staghorn_dir().join("languages")
    }

    /// Project merged output (team + personal + project)
    pub fn output(&self) -> PathBuf {
        self.root.join(OUTPUT_FILE)
    }

    /// Whether the directory has been set up for staghorn
    pub fn is_initialized(&self) -> bool {
        self.staghorn_dir().is_dir()
    }
}

/// Team source layout (a local checkout or its cached snapshot)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamPaths {
    pub root: PathBuf,
}

impl TeamPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Team layer
    pub fn claude_file(&self) -> PathBuf {
        self.root.join(OUTPUT_FILE)
    }

    pub fn languages_dir(&self) -> PathBuf {
        self.root.join("languages")
    }
}
