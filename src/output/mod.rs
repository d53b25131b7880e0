//! Writing merged output and split layers
//!
//! Merged output only ever replaces files that carry the managed banner
//! or that match the digest recorded when staghorn last wrote them, so a
//! hand-written `CLAUDE.md` is never clobbered without `--force`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use staghorn_merge::is_managed;
use tracing::debug;

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("{0} exists and is not managed by staghorn (use --force to overwrite)")]
    Unmanaged(PathBuf),

    #[error("Failed to write {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Corrupt output ledger at {path}: {source}")]
    Ledger {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// What a write did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Created,
    Updated,
    Unchanged,
    /// Would have written; dry run
    Skipped,
}

impl WriteOutcome {
    pub fn describe(&self) -> &'static str {
        match self {
            WriteOutcome::Created => "created",
            WriteOutcome::Updated => "updated",
            WriteOutcome::Unchanged => "unchanged",
            WriteOutcome::Skipped => "dry run",
        }
    }
}

/// SHA-256 of file content, hex encoded
pub fn content_digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    /// Output path to digest of the content last written there
    outputs: BTreeMap<String, String>,
}

/// Record of outputs staghorn wrote.
///
/// Plain output has no banner, so the digest is what marks it as managed.
#[derive(Debug, Clone)]
pub struct OutputLedger {
    path: PathBuf,
}

impl OutputLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<LedgerFile, OutputError> {
        match read_existing(&self.path)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| OutputError::Ledger {
                path: self.path.clone(),
                source,
            }),
            None => Ok(LedgerFile::default()),
        }
    }

    /// Digest recorded for `output`, if any
    pub fn digest_for(&self, output: &Path) -> Result<Option<String>, OutputError> {
        Ok(self.load()?.outputs.remove(&output.to_string_lossy().to_string()))
    }

    /// Remember what was written to `output`
    pub fn record(&self, output: &Path, content: &str) -> Result<(), OutputError> {
        let mut ledger = self.load()?;
        ledger
            .outputs
            .insert(output.to_string_lossy().to_string(), content_digest(content));
        let json = serde_json::to_string_pretty(&ledger).map_err(|source| OutputError::Ledger {
            path: self.path.clone(),
            source,
        })?;
        write_file(&self.path, &json, true)?;
        Ok(())
    }
}

/// Normalize file content to a single trailing newline
fn with_newline(content: &str) -> String {
    let mut out = content.trim_end().to_string();
    out.push('\n');
    out
}

fn read_existing(path: &Path) -> Result<Option<String>, OutputError> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(OutputError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn write_file(path: &Path, content: &str, existed: bool) -> Result<WriteOutcome, OutputError> {
    let io_err = |source: io::Error| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    fs::write(path, content).map_err(io_err)?;
    debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(if existed {
        WriteOutcome::Updated
    } else {
        WriteOutcome::Created
    })
}

/// Write merged output, refusing to replace an unmanaged file unless `force`.
///
/// With a ledger, a bannerless file whose digest matches the last recorded
/// write also counts as managed, and each write is recorded.
pub fn write_managed(
    path: &Path,
    content: &str,
    force: bool,
    dry_run: bool,
    ledger: Option<&OutputLedger>,
) -> Result<WriteOutcome, OutputError> {
    let content = with_newline(content);
    let existing = read_existing(path)?;

    if let Some(current) = &existing {
        if *current == content {
            return Ok(WriteOutcome::Unchanged);
        }
        if !force && !is_managed(current) {
            let recorded = match ledger {
                Some(ledger) => ledger.digest_for(path)?,
                None => None,
            };
            if recorded.as_deref() != Some(content_digest(current).as_str()) {
                return Err(OutputError::Unmanaged(path.to_path_buf()));
            }
        }
    }
    if dry_run {
        return Ok(WriteOutcome::Skipped);
    }
    let outcome = write_file(path, &content, existing.is_some())?;
    if let Some(ledger) = ledger {
        ledger.record(path, &content)?;
    }
    Ok(outcome)
}

/// Write a layer source file (personal, project, or a language file)
pub fn write_layer(path: &Path, content: &str, dry_run: bool) -> Result<WriteOutcome, OutputError> {
    let content = with_newline(content);
    let existing = read_existing(path)?;

    if existing.as_deref() == Some(content.as_str()) {
        return Ok(WriteOutcome::Unchanged);
    }
    if dry_run {
        return Ok(WriteOutcome::Skipped);
    }
    write_file(path, &content, existing.is_some())
}
