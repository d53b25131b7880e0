//! Markdown section parser.
//!
//! Splits a markdown string into a preamble and an ordered list of
//! level-2 sections. Only `##` headers delimit sections; everything else
//! is opaque body text.

use serde::{Deserialize, Serialize};

/// A level-2-header-delimited block of a markdown document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Header text without the `##` marker, trimmed.
    pub header: String,

    /// Body text up to the next level-2 header, trimmed.
    pub content: String,

    /// Layer that owns the primary content. Unset until merge assigns it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Section {
    pub fn new(header: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            content: content.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Whether the section body is empty or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Case-insensitive header identity.
    pub fn matches(&self, header: &str) -> bool {
        header_key(&self.header) == header_key(header)
    }
}

/// Parsed form of one markdown string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Everything before the first level-2 header, trimmed.
    pub preamble: String,

    /// Sections in document order.
    pub sections: Vec<Section>,
}

impl Document {
    /// Find a section by header (case-insensitive exact match).
    pub fn find(&self, header: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.matches(header))
    }

    /// Mutable variant of [`Document::find`].
    pub fn find_mut(&mut self, header: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.matches(header))
    }

    /// Headers in document order.
    pub fn headers(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.header.as_str()).collect()
    }

    /// Tag every section with the given source.
    pub fn assign_source(&mut self, source: &str) {
        for section in &mut self.sections {
            section.source = Some(source.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.preamble.is_empty() && self.sections.is_empty()
    }
}

/// Normalized key used for header comparison.
pub(crate) fn header_key(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Return the header text if `line` is a level-2 header.
///
/// Exactly two `#` followed by whitespace and non-empty text.
pub(crate) fn level2_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("##")?;
    if rest.starts_with('#') {
        return None;
    }
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    let text = rest.trim();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Tracks whether a line scan is inside a fenced code block.
#[derive(Debug, Default)]
pub(crate) struct FenceState {
    open: Option<(char, usize)>,
}

impl FenceState {
    /// Feed one line; returns true if the line is part of a fence
    /// (either a delimiter or fenced body).
    pub(crate) fn advance(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let fence = fence_marker(trimmed);
        match (self.open, fence) {
            (None, Some(marker)) => {
                self.open = Some(marker);
                true
            }
            (Some((ch, len)), Some((fch, flen))) if ch == fch && flen >= len => {
                if trimmed.trim_end().chars().all(|c| c == fch) {
                    self.open = None;
                }
                true
            }
            (Some(_), _) => true,
            (None, None) => false,
        }
    }
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let ch = line.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = line.chars().take_while(|&c| c == ch).count();
    if len >= 3 { Some((ch, len)) } else { None }
}

/// Parse markdown into a [`Document`].
///
/// Total over any input: no headers yields an all-preamble document, empty
/// input yields an empty document.
pub fn parse(content: &str) -> Document {
    let mut preamble: Vec<&str> = Vec::new();
    let mut sections: Vec<(String, Vec<&str>)> = Vec::new();
    let mut fences = FenceState::default();

    for line in content.lines() {
        let fenced = fences.advance(line);
        if !fenced {
            if let Some(header) = level2_header(line) {
                sections.push((header.to_string(), Vec::new()));
                continue;
            }
        }
        match sections.last_mut() {
            Some((_, body)) => body.push(line),
            None => preamble.push(line),
        }
    }

    Document {
        preamble: preamble.join("\n").trim().to_string(),
        sections: sections
            .into_iter()
            .map(|(header, body)| Section::new(header, body.join("\n").trim()))
            .collect(),
    }
}
