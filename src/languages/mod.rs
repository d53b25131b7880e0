//! Language detection and selection
//!
//! Detects project languages from marker files in the project root, then
//! combines detection with the `[languages]` settings to get the active set.

use std::fs;
use std::io;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;

use crate::config::LanguageSettings;

/// Marker file patterns per language, matched against root entry names
const MARKERS: &[(&str, &[&str])] = &[
    ("c", &["CMakeLists.txt", "*.c"]),
    ("cpp", &["*.cpp", "*.cc", "*.hpp"]),
    ("csharp", &["*.csproj", "*.sln"]),
    ("dart", &["pubspec.yaml"]),
    ("elixir", &["mix.exs"]),
    ("go", &["go.mod"]),
    ("java", &["pom.xml", "build.gradle"]),
    ("javascript", &["package.json"]),
    ("kotlin", &["build.gradle.kts"]),
    ("php", &["composer.json"]),
    ("python", &["pyproject.toml", "setup.py", "setup.cfg", "requirements*.txt", "Pipfile"]),
    ("ruby", &["Gemfile", "*.gemspec"]),
    ("rust", &["Cargo.toml"]),
    ("scala", &["build.sbt"]),
    ("swift", &["Package.swift", "*.xcodeproj"]),
    ("terraform", &["*.tf"]),
    ("typescript", &["tsconfig.json"]),
    ("zig", &["build.zig"]),
];

/// Compiled marker patterns
pub struct Detector {
    sets: Vec<(&'static str, GlobSet)>,
}

impl Detector {
    pub fn new() -> Result<Self, globset::Error> {
        let mut sets = Vec::with_capacity(MARKERS.len());
        for (language, patterns) in MARKERS {
            let mut builder = GlobSetBuilder::new();
            for pattern in *patterns {
                builder.add(Glob::new(pattern)?);
            }
            sets.push((*language, builder.build()?));
        }
        Ok(Self { sets })
    }

    /// Languages whose markers match any of the names, sorted
    pub fn detect_names<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let names: Vec<&str> = names.into_iter().collect();
        self.sets
            .iter()
            .filter(|(_, set)| names.iter().any(|n| set.is_match(n)))
            .map(|(lang, _)| lang.to_string())
            .collect()
    }

    /// Languages detected from the entries of `root` (not recursive)
    pub fn detect(&self, root: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(self.detect_names(names.iter().map(String::as_str)))
    }
}

/// Outcome of combining detection with settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LanguageSelection {
    pub detected: Vec<String>,
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    pub active: Vec<String>,
}

/// Active = (detected if auto-detect) ∪ enabled − disabled, sorted
pub fn select(settings: &LanguageSettings, detected: Vec<String>) -> LanguageSelection {
    let mut active: Vec<String> = Vec::new();
    if settings.auto_detect {
        active.extend(detected.iter().cloned());
    }
    active.extend(settings.enabled.iter().cloned());
    active.retain(|lang| !settings.disabled.contains(lang));
    active.sort();
    active.dedup();

    LanguageSelection {
        detected,
        enabled: settings.enabled.clone(),
        disabled: settings.disabled.clone(),
        active,
    }
}
