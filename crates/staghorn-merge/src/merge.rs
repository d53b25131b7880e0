//! Layer merge algorithm.
//!
//! The first non-blank layer is the base. Every later layer is folded into
//! it section by section:
//! - Known header (case-insensitive): appended under `### <Source> Additions`
//! - New header: appended as a new top-level section
//!
//! Blank layers and blank sections (base or overlay) are skipped.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::document::{parse, Document, Section};
use crate::language::{build_language_section, title_case, LanguageFile};
use crate::provenance::marker;
use crate::render::render;

/// One named source of markdown content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub content: String,

    /// Open label, e.g. `team`, `personal`, `project`.
    pub source: String,
}

impl Layer {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Options for a single merge.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Emit the banner and provenance markers.
    pub annotate: bool,

    /// Repository label shown in the banner.
    pub source_repo: Option<String>,

    /// Date stamp shown in the banner.
    pub date: Option<NaiveDate>,

    /// Active language identifiers.
    pub languages: Vec<String>,

    /// Per-language files in layer order.
    pub language_files: BTreeMap<String, Vec<LanguageFile>>,
}

impl MergeOptions {
    pub fn annotated() -> Self {
        Self {
            annotate: true,
            ..Self::default()
        }
    }

    pub fn with_source_repo(mut self, repo: impl Into<String>) -> Self {
        self.source_repo = Some(repo.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_languages(
        mut self,
        languages: Vec<String>,
        language_files: BTreeMap<String, Vec<LanguageFile>>,
    ) -> Self {
        self.languages = languages;
        self.language_files = language_files;
        self
    }
}

/// Two layers used the same header with different capitalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCollision {
    /// Header as it appears in the merged document.
    pub existing: String,

    /// Header as written in the contributing layer.
    pub incoming: String,

    /// Contributing layer.
    pub source: String,
}

/// Diagnostics collected while merging. Merging itself never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Source of the base layer, `None` when every layer was blank.
    pub base_source: Option<String>,

    /// Sources whose layers were blank.
    pub skipped_layers: Vec<String>,

    /// Overlay layers whose preamble was not carried into the result.
    pub ignored_preambles: Vec<String>,

    /// Case-only header mismatches that were merged silently.
    pub collisions: Vec<HeaderCollision>,
}

/// Merged document plus its rendered form.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub text: String,
    pub document: Document,
    pub report: MergeReport,
}

/// `### <Source> Additions` heading for a contributing layer.
pub fn additions_header(source: &str) -> String {
    format!("### {} Additions", title_case(source))
}

/// Merge layers into one in-memory document.
pub fn merge_document(layers: &[Layer], options: &MergeOptions) -> (Document, MergeReport) {
    let mut report = MergeReport::default();

    let Some(base_index) = layers.iter().position(|l| !l.is_blank()) else {
        report.skipped_layers = layers.iter().map(|l| l.source.clone()).collect();
        return (Document::default(), report);
    };

    let base = &layers[base_index];
    let mut document = parse(&base.content);
    document.sections.retain(|s| !s.is_blank());
    document.assign_source(&base.source);
    report.base_source = Some(base.source.clone());

    for (i, layer) in layers.iter().enumerate() {
        if i == base_index {
            continue;
        }
        if layer.is_blank() {
            report.skipped_layers.push(layer.source.clone());
            continue;
        }
        fold_layer(&mut document, layer, options.annotate, &mut report);
    }

    (document, report)
}

fn fold_layer(document: &mut Document, layer: &Layer, annotate: bool, report: &mut MergeReport) {
    let overlay = parse(&layer.content);
    if !overlay.preamble.is_empty() {
        report.ignored_preambles.push(layer.source.clone());
    }

    for section in overlay.sections {
        if section.is_blank() {
            continue;
        }
        match document.find_mut(&section.header) {
            Some(existing) => {
                if existing.header != section.header {
                    report.collisions.push(HeaderCollision {
                        existing: existing.header.clone(),
                        incoming: section.header.clone(),
                        source: layer.source.clone(),
                    });
                }
                append_addition(existing, &section.content, &layer.source, annotate);
            }
            None => {
                document.sections.push(section.with_source(layer.source.clone()));
            }
        }
    }
}

fn append_addition(existing: &mut Section, content: &str, source: &str, annotate: bool) {
    let mut addition = String::new();
    if annotate {
        addition.push_str(&marker(source));
        addition.push('\n');
    }
    addition.push_str(&additions_header(source));
    addition.push_str("\n\n");
    addition.push_str(content.trim());

    existing.content = format!("{}\n\n{}", existing.content.trim_end(), addition);
}

/// Merge, render, and append the language sections.
pub fn merge_with_report(layers: &[Layer], options: &MergeOptions) -> MergeOutcome {
    let (document, report) = merge_document(layers, options);
    let Some(base_source) = report.base_source.as_deref() else {
        return MergeOutcome {
            text: String::new(),
            document,
            report,
        };
    };

    let mut text = render(&document, options, base_source);
    let languages =
        build_language_section(&options.languages, &options.language_files, options.annotate);
    if !languages.is_empty() {
        text.push_str("\n\n");
        text.push_str(&languages);
    }

    MergeOutcome {
        text,
        document,
        report,
    }
}

/// Merge layers into rendered markdown. All layers blank yields `""`.
pub fn merge(layers: &[Layer], options: &MergeOptions) -> String {
    merge_with_report(layers, options).text
}
