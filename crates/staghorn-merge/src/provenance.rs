//! Provenance markers and the inverse splitter.
//!
//! Marker grammar (nothing else is recognized):
//! - `<!-- staghorn:source:<label> -->`
//! - `<!-- staghorn:source:<label>:<language> -->`

use std::collections::HashMap;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::document::{level2_header, parse, Document, FenceState, Section};
use crate::error::ProvenanceError;
use crate::language::promote_headers;
use crate::merge::MergeOptions;
use crate::render::render;

/// Fixed leading text of the managed-file banner.
pub const MANAGED_BANNER_PREFIX: &str = "<!-- Managed by staghorn";

const MARKER_PREFIX: &str = "<!-- staghorn:source:";
const MARKER_SUFFIX: &str = " -->";

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<!-- staghorn:source:([^:\s>]+)(?::([^:\s>]+))? -->")
            .expect("marker pattern is valid")
    })
}

fn additions_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^###\s+\S.*\s+Additions\s*$").expect("additions pattern is valid"))
}

/// Plain source marker.
pub fn marker(source: &str) -> String {
    format!("{MARKER_PREFIX}{source}{MARKER_SUFFIX}")
}

/// Compound source + language marker.
pub fn language_marker(source: &str, language: &str) -> String {
    format!("{MARKER_PREFIX}{source}:{language}{MARKER_SUFFIX}")
}

/// A marker found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub source: String,
    pub language: Option<String>,
}

/// All markers in document order.
pub fn markers(text: &str) -> Vec<Marker> {
    marker_regex()
        .captures_iter(text)
        .map(|caps| Marker {
            source: caps[1].to_string(),
            language: caps.get(2).map(|m| m.as_str().to_string()),
        })
        .collect()
}

/// Source of the last marker in `text`, if any.
pub fn last_marker_source(text: &str) -> Option<String> {
    markers(text).pop().map(|m| m.source)
}

/// Whether `text` carries any provenance marker.
pub fn has_markers(text: &str) -> bool {
    marker_regex().is_match(text)
}

/// Whether `text` starts with the managed-file banner.
pub fn is_managed(text: &str) -> bool {
    text.trim_start().starts_with(MANAGED_BANNER_PREFIX)
}

/// Remove the banner and all markers, collapsing the blank lines they leave.
pub fn strip_markers(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with(MANAGED_BANNER_PREFIX) {
            continue;
        }
        if marker_regex().is_match(trimmed) && marker_regex().replace_all(trimmed, "").trim().is_empty() {
            continue;
        }
        if trimmed.is_empty() && out.last().is_some_and(|l| l.trim().is_empty()) {
            continue;
        }
        out.push(line);
    }
    out.join("\n").trim().to_string()
}

/// One run of text attributed to a single marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub source: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Trimmed text between this marker and the next.
    pub text: String,
}

/// Result of splitting an annotated document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitDocument {
    /// Distinct sources in first-occurrence order.
    pub sources: Vec<String>,

    /// Aggregated text per source (all segments, blank-line joined).
    pub content: HashMap<String, String>,

    /// Every segment in document order.
    pub segments: Vec<Segment>,
}

/// Split an annotated document into per-source text.
///
/// Text before the first marker (the banner) is not attributed to any
/// source. Repeated markers for one source are concatenated.
pub fn split(text: &str) -> Result<SplitDocument, ProvenanceError> {
    let re = marker_regex();
    let found: Vec<_> = re.captures_iter(text).collect();
    if found.is_empty() {
        return Err(ProvenanceError::NoMarkers);
    }

    let mut result = SplitDocument::default();
    for (i, caps) in found.iter().enumerate() {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let end = found
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        let body = text[whole.end()..end].trim().to_string();
        let source = caps[1].to_string();

        if !result.sources.contains(&source) {
            result.sources.push(source.clone());
        }
        if !body.is_empty() {
            let entry = result.content.entry(source.clone()).or_default();
            if !entry.is_empty() {
                entry.push_str("\n\n");
            }
            entry.push_str(&body);
        } else {
            result.content.entry(source.clone()).or_default();
        }

        result.segments.push(Segment {
            source,
            language: caps.get(2).map(|m| m.as_str().to_string()),
            text: body,
        });
    }

    Ok(result)
}

impl SplitDocument {
    /// Aggregated text for a source.
    pub fn source_text(&self, source: &str) -> Option<&str> {
        self.content.get(source).map(String::as_str)
    }

    /// Languages contributed by a source, in first-occurrence order.
    pub fn languages_for(&self, source: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for seg in &self.segments {
            if seg.source != source {
                continue;
            }
            if let Some(lang) = &seg.language {
                if !out.contains(lang) {
                    out.push(lang.clone());
                }
            }
        }
        out
    }

    /// Rebuild a layer's own markdown (language blocks excluded).
    ///
    /// An Additions block is put back under a `##` header named after the
    /// section it was appended to.
    pub fn restore(&self, source: &str) -> String {
        let mut enclosing: Option<String> = None;
        let mut parts: Vec<String> = Vec::new();

        for seg in &self.segments {
            if seg.language.is_some() {
                enclosing = last_section_header(&seg.text).or(enclosing);
                continue;
            }
            if seg.source == source && !seg.text.is_empty() {
                parts.push(reparent_additions(&seg.text, enclosing.as_deref()));
            }
            enclosing = last_section_header(&seg.text).or(enclosing);
        }

        parts.join("\n\n")
    }

    /// Rebuild a layer's markdown on top of its current file.
    ///
    /// A merge never carries an overlay's preamble or its blank sections, so
    /// those come from `current`. Sections keep the order and header spelling
    /// of `current`; sections only in the document follow in document order,
    /// and non-blank sections missing from the document are dropped.
    pub fn restore_onto(&self, source: &str, current: &str) -> String {
        let Document {
            preamble: restored_preamble,
            sections: restored,
        } = parse(&self.restore(source));
        let existing = parse(current);

        let preamble = if restored_preamble.is_empty() {
            existing.preamble
        } else {
            restored_preamble
        };

        let mut used = vec![false; restored.len()];
        let mut sections: Vec<Section> = Vec::new();
        for section in existing.sections {
            let found = restored
                .iter()
                .enumerate()
                .find(|(i, s)| !used[*i] && s.matches(&section.header));
            match found {
                Some((i, edited)) => {
                    used[i] = true;
                    sections.push(Section::new(section.header, edited.content.clone()));
                }
                None if section.is_blank() => sections.push(section),
                None => {}
            }
        }
        sections.extend(
            restored
                .into_iter()
                .zip(used)
                .filter(|(_, used)| !used)
                .map(|(section, _)| section),
        );

        render(&Document { preamble, sections }, &MergeOptions::default(), source)
    }

    /// Rebuild a layer's language file for `language`.
    ///
    /// Drops the display header and the Additions header the composer
    /// inserted and promotes headers back one level.
    pub fn language_content(&self, source: &str, language: &str) -> Option<String> {
        let bodies: Vec<String> = self
            .segments
            .iter()
            .filter(|s| s.source == source && s.language.as_deref() == Some(language))
            .map(|s| strip_composer_header(&s.text))
            .filter(|t| !t.is_empty())
            .map(|t| promote_headers(&t))
            .collect();

        if bodies.is_empty() {
            None
        } else {
            Some(bodies.join("\n\n"))
        }
    }
}

/// Replace a leading `### <X> Additions` line with the enclosing `##` header.
fn reparent_additions(text: &str, enclosing: Option<&str>) -> String {
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    match enclosing {
        Some(header) if additions_regex().is_match(first.trim()) => {
            let rest = rest.trim();
            if rest.is_empty() {
                format!("## {header}")
            } else {
                format!("## {header}\n\n{rest}")
            }
        }
        _ => text.to_string(),
    }
}

/// Drop the first line if it is a `## <Display>` or `### <X> Additions` header.
fn strip_composer_header(text: &str) -> String {
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    let first = first.trim();
    if level2_header(first).is_some() || additions_regex().is_match(first) {
        rest.trim().to_string()
    } else {
        text.trim().to_string()
    }
}

fn last_section_header(text: &str) -> Option<String> {
    let mut fences = FenceState::default();
    let mut last = None;
    for line in text.lines() {
        if fences.advance(line) {
            continue;
        }
        if let Some(h) = level2_header(line) {
            last = Some(h.to_string());
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANNOTATED: &str = "\
<!-- Managed by staghorn | Source: acme/standards -->

<!-- staghorn:source:team -->
## Code Style

Format code.

<!-- staghorn:source:personal -->
### Personal Additions

I prefer tabs.

<!-- staghorn:source:team -->
## Testing

Write tests.

<!-- staghorn:source:personal -->
## Editor

Use helix.

<!-- staghorn:source:team:python -->
## Python

### Typing

Use type hints.

<!-- staghorn:source:personal:python -->
### Personal Additions

#### Tools

Prefer uv.";

    #[test]
    fn test_marker_format() {
        assert_eq!(marker("team"), "<!-- staghorn:source:team -->");
        assert_eq!(
            language_marker("personal", "rust"),
            "<!-- staghorn:source:personal:rust -->"
        );
    }

    #[test]
    fn test_markers_parsed_in_order() {
        let found = markers(ANNOTATED);
        assert_eq!(found.len(), 6);
        assert_eq!(found[0].source, "team");
        assert_eq!(found[0].language, None);
        assert_eq!(found[4].language.as_deref(), Some("python"));
    }

    #[test]
    fn test_other_comments_are_not_markers() {
        assert!(!has_markers("<!-- staghorn source team -->"));
        assert!(!has_markers("<!--staghorn:source:team-->"));
        assert!(!has_markers("<!-- note -->"));
        assert!(has_markers("x <!-- staghorn:source:team --> y"));
    }

    #[test]
    fn test_split_without_markers_fails() {
        let err = split("## Plain\n\ntext").unwrap_err();
        assert!(matches!(err, ProvenanceError::NoMarkers));
    }

    #[test]
    fn test_split_sources_in_first_occurrence_order() {
        let doc = split(ANNOTATED).unwrap();
        assert_eq!(doc.sources, vec!["team", "personal"]);
    }

    #[test]
    fn test_split_concatenates_repeated_sources() {
        let doc = split(ANNOTATED).unwrap();
        let team = doc.source_text("team").unwrap();
        assert!(team.starts_with("## Code Style\n\nFormat code."));
        assert!(team.contains("## Testing\n\nWrite tests."));
        assert!(team.contains("### Typing"));
        assert!(!team.contains("Managed by staghorn"));
        assert!(!team.contains("staghorn:source"));

        let personal = doc.source_text("personal").unwrap();
        assert!(personal.contains("I prefer tabs."));
        assert!(personal.contains("## Editor"));
        assert!(personal.contains("Prefer uv."));
    }

    #[test]
    fn test_restore_reparents_additions() {
        let doc = split(ANNOTATED).unwrap();
        assert_eq!(
            doc.restore("personal"),
            "## Code Style\n\nI prefer tabs.\n\n## Editor\n\nUse helix."
        );
        assert_eq!(
            doc.restore("team"),
            "## Code Style\n\nFormat code.\n\n## Testing\n\nWrite tests."
        );
    }

    #[test]
    fn test_restore_onto_keeps_unmerged_text() {
        let doc = split(ANNOTATED).unwrap();
        let current = "My private notes.\n\n## code style\n\nI prefer tabs.\n\n## Scratch\n\n## Editor\n\nUse vim.";
        assert_eq!(
            doc.restore_onto("personal", current),
            "My private notes.\n\n## code style\n\nI prefer tabs.\n\n## Scratch\n\n## Editor\n\nUse helix."
        );
    }

    #[test]
    fn test_restore_onto_adds_and_drops_sections() {
        let doc = split(
            "<!-- staghorn:source:personal -->\n## Editor\n\nUse helix.\n\n## Shell\n\nUse fish.",
        )
        .unwrap();
        let current = "## Old\n\nremoved in the edit\n\n## Editor\n\nUse vim.";
        assert_eq!(
            doc.restore_onto("personal", current),
            "## Editor\n\nUse helix.\n\n## Shell\n\nUse fish."
        );
        assert_eq!(doc.restore_onto("personal", ""), doc.restore("personal"));
    }

    #[test]
    fn test_language_content_promotes_headers() {
        let doc = split(ANNOTATED).unwrap();
        assert_eq!(
            doc.language_content("team", "python").as_deref(),
            Some("## Typing\n\nUse type hints.")
        );
        assert_eq!(
            doc.language_content("personal", "python").as_deref(),
            Some("### Tools\n\nPrefer uv.")
        );
        assert_eq!(doc.language_content("team", "rust"), None);
        assert_eq!(doc.languages_for("personal"), vec!["python"]);
    }

    #[test]
    fn test_is_managed() {
        assert!(is_managed(ANNOTATED));
        assert!(is_managed("\n<!-- Managed by staghorn -->\n"));
        assert!(!is_managed("# My own notes"));
    }

    #[test]
    fn test_strip_markers() {
        let stripped = strip_markers(ANNOTATED);
        assert!(!stripped.contains("<!--"));
        assert!(stripped.starts_with("## Code Style"));
        assert!(!stripped.contains("\n\n\n"));
    }
}
