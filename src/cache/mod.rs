//! Team snapshot cache
//!
//! The team source is usually a shared checkout that may be missing or
//! unmounted. Each sync copies its `CLAUDE.md` and `languages/*.md` into
//! `~/.cache/staghorn/team` along with a `meta.json`, so later syncs work
//! from the snapshot while it is fresh or while the source is unavailable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::paths::{TeamPaths, OUTPUT_FILE};
use crate::sources::{read_languages, read_optional, SourceError};

/// Metadata file inside the cache directory
pub const META_FILE: &str = "meta.json";

/// Schema version for meta.json
pub const META_SCHEMA_VERSION: u32 = 1;

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Corrupt cache metadata at {path}: {source}")]
    Meta {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Team source {0} has no CLAUDE.md and no language files")]
    EmptySource(PathBuf),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Snapshot metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub schema_version: u32,

    /// Directory the snapshot was taken from
    pub source: String,

    pub fetched_at: DateTime<Utc>,

    /// SHA-256 over the snapshot's file names and contents
    pub digest: String,

    /// Relative paths of the cached files
    pub files: Vec<String>,
}

/// Age of a snapshot relative to the TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Freshness {
    Fresh { age_seconds: i64 },
    Stale { age_seconds: i64 },
    Missing,
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Freshness::Fresh { .. })
    }
}

/// How the team layer was obtained for this run
#[derive(Debug, Clone, PartialEq)]
pub enum TeamResolution {
    /// Snapshot refreshed from the source
    Refreshed(CacheMeta),
    /// Existing snapshot used
    Cached { meta: CacheMeta, stale: bool },
    /// No source and no snapshot
    Unavailable,
}

/// On-disk team snapshot
#[derive(Debug, Clone)]
pub struct TeamCache {
    dir: PathBuf,
}

impl TeamCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The snapshot has the same layout as a team source
    pub fn layout(&self) -> TeamPaths {
        TeamPaths::new(&self.dir)
    }

    fn meta_path(&self) -> PathBuf {
        self.dir.join(META_FILE)
    }

    /// Load snapshot metadata, `None` if there is no snapshot
    pub fn meta(&self) -> Result<Option<CacheMeta>, CacheError> {
        let path = self.meta_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| CacheError::Meta { path, source })
    }

    pub fn freshness(&self, ttl_seconds: u64, now: DateTime<Utc>) -> Result<Freshness, CacheError> {
        Ok(match self.meta()? {
            Some(meta) => freshness_of(&meta, ttl_seconds, now),
            None => Freshness::Missing,
        })
    }

    /// Replace the snapshot with the current contents of `source_root`
    pub fn refresh(&self, source_root: &Path, now: DateTime<Utc>) -> Result<CacheMeta, CacheError> {
        let team = TeamPaths::new(source_root);
        let claude = read_optional(&team.claude_file())?;
        let languages = read_languages(&team.languages_dir(), staghorn_merge::TEAM)?;

        if claude.is_none() && languages.is_empty() {
            return Err(CacheError::EmptySource(source_root.to_path_buf()));
        }

        let mut files: Vec<(String, String)> = Vec::new();
        if let Some(content) = claude {
            files.push((OUTPUT_FILE.to_string(), content));
        }
        for file in languages {
            files.push((format!("languages/{}.md", file.language), file.content));
        }

        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(io_err(&self.dir))?;
        }
        for (rel, content) in &files {
            let path = self.dir.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
            fs::write(&path, content).map_err(io_err(&path))?;
        }

        let meta = CacheMeta {
            schema_version: META_SCHEMA_VERSION,
            source: source_root.to_string_lossy().to_string(),
            fetched_at: now,
            digest: digest_files(&files),
            files: files.iter().map(|(rel, _)| rel.clone()).collect(),
        };
        let json = serde_json::to_string_pretty(&meta).map_err(|source| CacheError::Meta {
            path: self.meta_path(),
            source,
        })?;
        let meta_path = self.meta_path();
        fs::write(&meta_path, json).map_err(io_err(&meta_path))?;

        info!(source = %meta.source, files = meta.files.len(), "team snapshot refreshed");
        Ok(meta)
    }

    /// Delete the snapshot. Returns false if there was none.
    pub fn clear(&self) -> Result<bool, CacheError> {
        if !self.dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&self.dir).map_err(io_err(&self.dir))?;
        Ok(true)
    }

    /// Decide where the team layer comes from for this run.
    ///
    /// A reachable source refreshes a missing or stale snapshot (or any
    /// snapshot when `force`); an unreachable source falls back to the
    /// snapshot.
    pub fn ensure(
        &self,
        source: Option<&Path>,
        ttl_seconds: u64,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<TeamResolution, CacheError> {
        let existing = self.meta()?;

        if let Some(root) = source {
            if root.is_dir() {
                let fresh = existing
                    .as_ref()
                    .map(|m| freshness_of(m, ttl_seconds, now).is_fresh() && m.source == root.to_string_lossy())
                    .unwrap_or(false);
                if force || !fresh {
                    return self.refresh(root, now).map(TeamResolution::Refreshed);
                }
                debug!(source = %root.display(), "team snapshot is fresh");
            } else {
                warn!(source = %root.display(), "team source not found; using cached snapshot if available");
            }
        }

        Ok(match existing {
            Some(meta) => {
                let stale = !freshness_of(&meta, ttl_seconds, now).is_fresh();
                TeamResolution::Cached { meta, stale }
            }
            None => TeamResolution::Unavailable,
        })
    }
}

fn freshness_of(meta: &CacheMeta, ttl_seconds: u64, now: DateTime<Utc>) -> Freshness {
    let age_seconds = (now - meta.fetched_at).num_seconds();
    let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
    if age_seconds < ttl {
        Freshness::Fresh { age_seconds }
    } else {
        Freshness::Stale { age_seconds }
    }
}

fn digest_files(files: &[(String, String)]) -> String {
    let mut hasher = Sha256::new();
    for (rel, content) in files {
        hasher.update(rel.as_bytes());
        hasher.update([0u8]);
        hasher.update(content.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn team_source(root: &Path) {
        fs::write(root.join("CLAUDE.md"), "## Style\n\nFormat code.").unwrap();
        fs::create_dir_all(root.join("languages")).unwrap();
        fs::write(root.join("languages/rust.md"), "Run clippy.").unwrap();
    }

    #[test]
    fn test_refresh_writes_snapshot_and_meta() {
        let src = TempDir::new().unwrap();
        let cache_root = TempDir::new().unwrap();
        team_source(src.path());

        let cache = TeamCache::new(cache_root.path().join("team"));
        let meta = cache.refresh(src.path(), Utc::now()).unwrap();

        assert_eq!(meta.files, vec!["CLAUDE.md", "languages/rust.md"]);
        assert_eq!(meta.digest.len(), 64);
        assert_eq!(
            fs::read_to_string(cache.layout().claude_file()).unwrap(),
            "## Style\n\nFormat code."
        );
        assert_eq!(cache.meta().unwrap(), Some(meta));
    }

    #[test]
    fn test_refresh_rejects_empty_source() {
        let src = TempDir::new().unwrap();
        let cache_root = TempDir::new().unwrap();
        let cache = TeamCache::new(cache_root.path().join("team"));
        assert!(matches!(
            cache.refresh(src.path(), Utc::now()),
            Err(CacheError::EmptySource(_))
        ));
    }

    #[test]
    fn test_freshness() {
        let src = TempDir::new().unwrap();
        let cache_root = TempDir::new().unwrap();
        team_source(src.path());
        let cache = TeamCache::new(cache_root.path().join("team"));

        let now = Utc::now();
        assert_eq!(cache.freshness(60, now).unwrap(), Freshness::Missing);

        cache.refresh(src.path(), now).unwrap();
        assert!(cache.freshness(60, now + Duration::seconds(30)).unwrap().is_fresh());
        assert_eq!(
            cache.freshness(60, now + Duration::seconds(90)).unwrap(),
            Freshness::Stale { age_seconds: 90 }
        );
    }

    #[test]
    fn test_ensure_uses_fresh_snapshot() {
        let src = TempDir::new().unwrap();
        let cache_root = TempDir::new().unwrap();
        team_source(src.path());
        let cache = TeamCache::new(cache_root.path().join("team"));
        let now = Utc::now();

        let first = cache.ensure(Some(src.path()), 3600, false, now).unwrap();
        assert!(matches!(first, TeamResolution::Refreshed(_)));

        fs::write(src.path().join("CLAUDE.md"), "changed").unwrap();
        let second = cache.ensure(Some(src.path()), 3600, false, now).unwrap();
        assert!(matches!(second, TeamResolution::Cached { stale: false, .. }));

        let forced = cache.ensure(Some(src.path()), 3600, true, now).unwrap();
        assert!(matches!(forced, TeamResolution::Refreshed(_)));
        assert_eq!(fs::read_to_string(cache.layout().claude_file()).unwrap(), "changed");
    }

    #[test]
    fn test_ensure_falls_back_when_source_missing() {
        let src = TempDir::new().unwrap();
        let cache_root = TempDir::new().unwrap();
        team_source(src.path());
        let cache = TeamCache::new(cache_root.path().join("team"));
        let now = Utc::now();
        cache.refresh(src.path(), now).unwrap();

        let gone = src.path().join("missing");
        let later = now + Duration::days(2);
        let resolution = cache.ensure(Some(&gone), 3600, false, later).unwrap();
        assert!(matches!(resolution, TeamResolution::Cached { stale: true, .. }));

        assert!(cache.clear().unwrap());
        assert!(!cache.clear().unwrap());
        assert_eq!(cache.ensure(Some(&gone), 3600, false, later).unwrap(), TeamResolution::Unavailable);
        assert_eq!(cache.ensure(None, 3600, false, later).unwrap(), TeamResolution::Unavailable);
    }
}
