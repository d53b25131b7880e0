//! Shared fixtures for the layered sync tests
//!
//! `tests/fixtures/layered` holds a team source, a home directory with a
//! personal layer, and a Python project. Each test copies it into a fresh
//! temp directory so writes never touch the checked-in files.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use staghorn::{Paths, Workspace};
use tempfile::TempDir;
use walkdir::WalkDir;

pub fn layered_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/layered")
}

pub fn golden(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/golden")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

/// Fixed sync date so banners match the golden files
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn copy_tree(src: &Path, dst: &Path) {
    for entry in WalkDir::new(src) {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(src).unwrap();
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

/// A private copy of the layered fixture
pub struct Sandbox {
    _dir: TempDir,
    pub root: PathBuf,
}

impl Sandbox {
    /// Copy the fixture and point the user config at the copied team source
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// Like `new`, with extra TOML appended to the user config
    pub fn with_config(extra: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        copy_tree(&layered_path(), &root);

        let config = format!(
            "[team]\nsource = \"{}\"\nrepo = \"acme/standards\"\n{extra}",
            root.join("team").display()
        );
        fs::write(root.join("home/.config/staghorn/config.toml"), config).unwrap();

        Self { _dir: dir, root }
    }

    pub fn home(&self) -> PathBuf {
        self.root.join("home")
    }

    pub fn team(&self) -> PathBuf {
        self.root.join("team")
    }

    pub fn project(&self) -> PathBuf {
        self.root.join("project")
    }

    pub fn paths(&self) -> Paths {
        Paths::rooted(&self.home())
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::load(self.paths(), self.project(), None).unwrap()
    }

    pub fn workspace_with(&self, overrides: serde_json::Value) -> Workspace {
        Workspace::load(self.paths(), self.project(), Some(overrides)).unwrap()
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root.join(rel)).unwrap()
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}
