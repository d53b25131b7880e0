//! Document renderer.
//!
//! Serializes a merged document back to markdown. Provenance markers are
//! run-length encoded: a marker is written only when the source changes.

use chrono::NaiveDate;

use crate::document::{Document, Section};
use crate::merge::MergeOptions;
use crate::provenance::{last_marker_source, marker, MANAGED_BANNER_PREFIX};

/// Managed-file banner line.
pub fn banner(source_repo: Option<&str>, date: Option<NaiveDate>) -> String {
    let mut line = MANAGED_BANNER_PREFIX.to_string();
    if let Some(repo) = source_repo {
        line.push_str(&format!(" | Source: {repo}"));
    }
    if let Some(date) = date {
        line.push_str(&format!(" | Last synced: {}", date.format("%Y-%m-%d")));
    }
    line.push_str(" -->");
    line
}

/// Render one section. `last` is the most recently emitted source; the
/// returned source is the new value after this block.
fn render_section(
    section: &Section,
    base_source: &str,
    annotate: bool,
    mut last: Option<String>,
) -> (String, Option<String>) {
    let source = section.source.as_deref().unwrap_or(base_source);
    let content = section.content.trim();

    let mut block = String::new();
    if annotate && last.as_deref() != Some(source) {
        block.push_str(&marker(source));
        block.push('\n');
        last = Some(source.to_string());
    }

    block.push_str("## ");
    block.push_str(&section.header);
    if !content.is_empty() {
        block.push_str("\n\n");
        block.push_str(content);
    }

    if annotate {
        last = last_marker_source(content).or(last);
    }
    (block, last)
}

/// Render a document.
///
/// Sections without a source inherit `base_source`.
pub fn render(document: &Document, options: &MergeOptions, base_source: &str) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut last: Option<String> = None;

    if options.annotate {
        blocks.push(banner(options.source_repo.as_deref(), options.date));
    }

    if !document.preamble.is_empty() {
        if options.annotate {
            blocks.push(format!("{}\n{}", marker(base_source), document.preamble));
            last = Some(base_source.to_string());
        } else {
            blocks.push(document.preamble.clone());
        }
    }

    let (sections, _) = document
        .sections
        .iter()
        .fold((Vec::new(), last), |(mut acc, last), section| {
            let (block, next) = render_section(section, base_source, options.annotate, last);
            acc.push(block);
            (acc, next)
        });
    blocks.extend(sections);

    blocks.join("\n\n").trim().to_string()
}
