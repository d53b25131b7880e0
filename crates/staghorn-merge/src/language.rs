//! Per-language block composer.
//!
//! Builds one top-level section per active language from layered
//! language files, nesting each file's headers one level deeper.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::document::FenceState;
use crate::merge::additions_header;
use crate::provenance::language_marker;

/// Deepest markdown header level.
const MAX_HEADER_LEVEL: usize = 6;

/// Display names for well-known language identifiers.
const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("bash", "Bash"),
    ("c", "C"),
    ("cpp", "C++"),
    ("csharp", "C#"),
    ("css", "CSS"),
    ("dart", "Dart"),
    ("elixir", "Elixir"),
    ("go", "Go"),
    ("haskell", "Haskell"),
    ("html", "HTML"),
    ("java", "Java"),
    ("javascript", "JavaScript"),
    ("kotlin", "Kotlin"),
    ("lua", "Lua"),
    ("php", "PHP"),
    ("python", "Python"),
    ("r", "R"),
    ("ruby", "Ruby"),
    ("rust", "Rust"),
    ("scala", "Scala"),
    ("shell", "Shell"),
    ("sql", "SQL"),
    ("swift", "Swift"),
    ("terraform", "Terraform"),
    ("typescript", "TypeScript"),
    ("zig", "Zig"),
];

/// One layer's file for a language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageFile {
    /// Language identifier, e.g. `python`.
    pub language: String,

    pub content: String,

    /// Layer label, e.g. `team`.
    pub source: String,

    /// Where the content was read from. Used to write split content back.
    pub origin: PathBuf,
}

impl LanguageFile {
    pub fn new(
        language: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        origin: impl Into<PathBuf>,
    ) -> Self {
        Self {
            language: language.into(),
            content: content.into(),
            source: source.into(),
            origin: origin.into(),
        }
    }
}

/// Human-readable name for a language identifier.
///
/// Unknown identifiers are title-cased.
pub fn display_name(language: &str) -> String {
    DISPLAY_NAMES
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(language))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| title_case(language))
}

/// Whether the identifier has a built-in display name.
pub fn is_known_language(language: &str) -> bool {
    DISPLAY_NAMES.iter().any(|(id, _)| id.eq_ignore_ascii_case(language))
}

/// Capitalize the first letter of every alphanumeric run.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Level of an ATX header line, if the line is one.
fn header_level(line: &str) -> Option<usize> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > MAX_HEADER_LEVEL {
        return None;
    }
    match line[hashes..].chars().next() {
        None => Some(hashes),
        Some(c) if c.is_whitespace() => Some(hashes),
        Some(_) => None,
    }
}

fn shift_headers(text: &str, shift: fn(usize) -> usize) -> String {
    let mut fences = FenceState::default();
    text.lines()
        .map(|line| {
            if fences.advance(line) {
                return line.to_string();
            }
            match header_level(line) {
                Some(level) => format!("{}{}", "#".repeat(shift(level)), &line[level..]),
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Push every header one level deeper, saturating at level 6.
///
/// Fenced code blocks are left untouched.
pub fn demote_headers(text: &str) -> String {
    shift_headers(text, |level| (level + 1).clamp(1, MAX_HEADER_LEVEL))
}

/// Inverse of [`demote_headers`]; level 1 stays level 1.
pub fn promote_headers(text: &str) -> String {
    shift_headers(text, |level| level.saturating_sub(1).clamp(1, MAX_HEADER_LEVEL))
}

/// Compose the per-language sections.
///
/// Languages are emitted in sorted order; a language with no non-blank file
/// produces nothing.
pub fn build_language_section(
    languages: &[String],
    files_by_language: &BTreeMap<String, Vec<LanguageFile>>,
    annotate: bool,
) -> String {
    let mut active: Vec<&String> = languages.iter().collect();
    active.sort();
    active.dedup();

    let mut sections: Vec<String> = Vec::new();
    for language in active {
        let Some(files) = files_by_language.get(language) else {
            continue;
        };
        let files: Vec<&LanguageFile> = files.iter().filter(|f| !f.content.trim().is_empty()).collect();
        if files.is_empty() {
            continue;
        }

        let mut blocks: Vec<String> = Vec::new();
        for (i, file) in files.iter().enumerate() {
            let heading = if i == 0 {
                format!("## {}", display_name(language))
            } else {
                additions_header(&file.source)
            };
            let body = demote_headers(file.content.trim());
            let block = format!("{heading}\n\n{body}");
            if annotate {
                blocks.push(format!("{}\n{block}", language_marker(&file.source, language)));
            } else {
                blocks.push(block);
            }
        }
        sections.push(blocks.join("\n\n"));
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(entries: &[(&str, &str, &str)]) -> BTreeMap<String, Vec<LanguageFile>> {
        let mut map: BTreeMap<String, Vec<LanguageFile>> = BTreeMap::new();
        for (lang, source, content) in entries {
            map.entry(lang.to_string()).or_default().push(LanguageFile::new(
                *lang,
                *content,
                *source,
                format!("/{source}/languages/{lang}.md"),
            ));
        }
        map
    }

    fn langs(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_display_names() {
        assert_eq!(display_name("python"), "Python");
        assert_eq!(display_name("csharp"), "C#");
        assert_eq!(display_name("TypeScript"), "TypeScript");
        assert_eq!(display_name("nim"), "Nim");
        assert_eq!(display_name("objective-c"), "Objective-C");
        assert!(is_known_language("rust"));
        assert!(!is_known_language("nim"));
    }

    #[test]
    fn test_demote_levels() {
        let input = "# One\n## Two\n### Three\n#### Four\n##### Five\n###### Six";
        assert_eq!(
            demote_headers(input),
            "## One\n### Two\n#### Three\n##### Four\n###### Five\n###### Six"
        );
    }

    #[test]
    fn test_demote_ignores_non_headers() {
        let input = "#hashtag\n####### seven\n> ## quoted\ntext # not header";
        assert_eq!(demote_headers(input), input);
    }

    #[test]
    fn test_demote_skips_fenced_code() {
        let input = "## Setup\n```python\n# comment\n## another\n```\n## After";
        assert_eq!(
            demote_headers(input),
            "### Setup\n```python\n# comment\n## another\n```\n### After"
        );
    }

    #[test]
    fn test_promote_is_inverse_below_six() {
        let input = "## A\n### B\n###### C\n# D";
        assert_eq!(promote_headers(input), "# A\n## B\n##### C\n# D");
        let text = "## Two\n\n### Three\n\nbody";
        assert_eq!(promote_headers(&demote_headers(text)), text);
    }

    #[test]
    fn test_single_layer_language_block() {
        let map = files(&[("python", "team", "## Typing\n\nUse hints.")]);
        let out = build_language_section(&langs(&["python"]), &map, false);
        assert_eq!(out, "## Python\n\n### Typing\n\nUse hints.");
    }

    #[test]
    fn test_layered_language_block() {
        let map = files(&[
            ("python", "team", "Use hints."),
            ("python", "personal", "## Tools\n\nPrefer uv."),
        ]);
        let out = build_language_section(&langs(&["python"]), &map, false);
        assert_eq!(
            out,
            "## Python\n\nUse hints.\n\n### Personal Additions\n\n### Tools\n\nPrefer uv."
        );
    }

    #[test]
    fn test_annotated_language_block() {
        let map = files(&[
            ("rust", "team", "Run clippy."),
            ("rust", "project", "Use nightly."),
        ]);
        let out = build_language_section(&langs(&["rust"]), &map, true);
        assert_eq!(
            out,
            "<!-- staghorn:source:team:rust -->\n## Rust\n\nRun clippy.\n\n\
             <!-- staghorn:source:project:rust -->\n### Project Additions\n\nUse nightly."
        );
    }

    #[test]
    fn test_languages_sorted_and_missing_skipped() {
        let map = files(&[("rust", "team", "R."), ("go", "team", "G.")]);
        let out = build_language_section(&langs(&["rust", "python", "go"]), &map, false);
        assert_eq!(out, "## Go\n\nG.\n\n## Rust\n\nR.");
    }

    #[test]
    fn test_blank_files_skipped() {
        let map = files(&[("go", "team", "   "), ("go", "personal", "Use gofmt.")]);
        let out = build_language_section(&langs(&["go"]), &map, false);
        assert_eq!(out, "## Go\n\nUse gofmt.");

        let map = files(&[("go", "team", "\n\n")]);
        assert_eq!(build_language_section(&langs(&["go"]), &map, false), "");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("personal"), "Personal");
        assert_eq!(title_case("my-team"), "My-Team");
        assert_eq!(title_case("PROJECT"), "Project");
    }
}
