//! Source resolution
//!
//! Reads each layer's markdown file and per-language files from disk and
//! turns them into merge inputs. A missing file is an absent layer, not
//! an error.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use staghorn_merge::{LanguageFile, Layer};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::is_valid_language_id;

/// Errors reading layer files
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to list {path}: {source}")]
    List { path: PathBuf, source: walkdir::Error },
}

/// Where one layer lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDir {
    /// Layer label, e.g. "team"
    pub source: String,

    /// Main markdown file
    pub file: PathBuf,

    /// Directory of `<language>.md` files
    pub languages_dir: PathBuf,
}

impl LayerDir {
    pub fn new(source: impl Into<String>, file: PathBuf, languages_dir: PathBuf) -> Self {
        Self {
            source: source.into(),
            file,
            languages_dir,
        }
    }
}

/// What was found for one layer
#[derive(Debug, Clone, Serialize)]
pub struct LayerOrigin {
    pub source: String,
    pub path: PathBuf,
    pub present: bool,
    pub bytes: usize,
    pub languages: Vec<String>,
}

/// Merge inputs read from disk
#[derive(Debug, Clone, Default)]
pub struct ResolvedSources {
    /// Layers in merge order; absent files are omitted
    pub layers: Vec<Layer>,

    /// Every configured layer, present or not
    pub origins: Vec<LayerOrigin>,

    /// Language files keyed by language id, in layer order
    pub language_files: BTreeMap<String, Vec<LanguageFile>>,
}

impl ResolvedSources {
    /// Language ids that have at least one file in any layer
    pub fn available_languages(&self) -> Vec<String> {
        self.language_files.keys().cloned().collect()
    }

    /// Keep only the given languages' files
    pub fn retain_languages(&mut self, active: &[String]) {
        self.language_files.retain(|lang, _| active.contains(lang));
    }
}

/// Read a file, treating "not found" as `None`
pub fn read_optional(path: &Path) -> Result<Option<String>, SourceError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SourceError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Read `<dir>/<language>.md` files, sorted by language id
pub fn read_languages(dir: &Path, source: &str) -> Result<Vec<LanguageFile>, SourceError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| SourceError::List {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let Some(language) = path.file_stem().and_then(|s| s.to_str()).map(str::to_lowercase) else {
            continue;
        };
        if !is_valid_language_id(&language) {
            debug!(path = %path.display(), "skipping file with invalid language name");
            continue;
        }
        let content = fs::read_to_string(path).map_err(|e| SourceError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        files.push(LanguageFile::new(language, content, source, path));
    }
    Ok(files)
}

/// Read every layer in order
pub fn resolve(dirs: &[LayerDir]) -> Result<ResolvedSources, SourceError> {
    let mut resolved = ResolvedSources::default();

    for dir in dirs {
        let content = read_optional(&dir.file)?;
        let languages = read_languages(&dir.languages_dir, &dir.source)?;
        debug!(
            source = %dir.source,
            path = %dir.file.display(),
            present = content.is_some(),
            languages = languages.len(),
            "resolved layer"
        );

        resolved.origins.push(LayerOrigin {
            source: dir.source.clone(),
            path: dir.file.clone(),
            present: content.is_some(),
            bytes: content.as_ref().map_or(0, String::len),
            languages: languages.iter().map(|f| f.language.clone()).collect(),
        });

        if let Some(content) = content {
            resolved.layers.push(Layer::new(content, dir.source.clone()));
        }
        for file in languages {
            resolved
                .language_files
                .entry(file.language.clone())
                .or_default()
                .push(file);
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layer_dir(root: &Path, source: &str) -> LayerDir {
        LayerDir::new(source, root.join(format!("{source}.md")), root.join(source).join("languages"))
    }

    #[test]
    fn test_missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_optional(&dir.path().join("nope.md")).unwrap(), None);
    }

    #[test]
    fn test_read_languages_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("rust.md"), "Run clippy.").unwrap();
        fs::write(dir.path().join("Go.md"), "Use gofmt.").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("Bad Name.md"), "ignored").unwrap();
        fs::create_dir(dir.path().join("python.md")).unwrap();

        let files = read_languages(dir.path(), "team").unwrap();
        let ids: Vec<&str> = files.iter().map(|f| f.language.as_str()).collect();
        assert_eq!(ids, vec!["go", "rust"]);
        assert_eq!(files[1].source, "team");
        assert_eq!(files[1].origin, dir.path().join("rust.md"));
    }

    #[test]
    fn test_resolve_orders_layers_and_languages() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("team.md"), "## A\n\nteam").unwrap();
        fs::create_dir_all(root.join("team/languages")).unwrap();
        fs::write(root.join("team/languages/python.md"), "team py").unwrap();
        fs::create_dir_all(root.join("personal/languages")).unwrap();
        fs::write(root.join("personal/languages/python.md"), "my py").unwrap();

        let resolved = resolve(&[layer_dir(root, "team"), layer_dir(root, "personal")]).unwrap();

        assert_eq!(resolved.layers.len(), 1);
        assert_eq!(resolved.layers[0].source, "team");
        assert_eq!(resolved.origins.len(), 2);
        assert!(!resolved.origins[1].present);
        assert_eq!(resolved.origins[1].languages, vec!["python"]);

        let python = &resolved.language_files["python"];
        let sources: Vec<&str> = python.iter().map(|f| f.source.as_str()).collect();
        assert_eq!(sources, vec!["team", "personal"]);
        assert_eq!(resolved.available_languages(), vec!["python"]);
    }

    #[test]
    fn test_retain_languages() {
        let mut resolved = ResolvedSources::default();
        for lang in ["go", "rust"] {
            resolved
                .language_files
                .insert(lang.to_string(), vec![LanguageFile::new(lang, "x", "team", "/x")]);
        }
        resolved.retain_languages(&["rust".to_string()]);
        assert_eq!(resolved.available_languages(), vec!["rust"]);
    }
}
