//! Layered markdown merge engine.
//!
//! Combines an ordered list of markdown layers (team, personal, project,
//! ...) into one document, optionally annotated with provenance markers,
//! and splits an annotated document back into its layers.
//!
//! Everything here is a pure function over strings; callers do the I/O.

mod document;
mod error;
mod language;
mod merge;
mod provenance;
mod render;

pub use document::{parse, Document, Section};
pub use error::ProvenanceError;
pub use language::{
    build_language_section, demote_headers, display_name, is_known_language, promote_headers,
    title_case, LanguageFile,
};
pub use merge::{
    additions_header, merge, merge_document, merge_with_report, HeaderCollision, Layer,
    MergeOptions, MergeOutcome, MergeReport,
};
pub use provenance::{
    has_markers, is_managed, language_marker, marker, markers, split, strip_markers, Marker,
    Segment, SplitDocument, MANAGED_BANNER_PREFIX,
};
pub use render::{banner, render};

/// Conventional layer labels, in merge order.
pub const TEAM: &str = "team";
pub const PERSONAL: &str = "personal";
pub const PROJECT: &str = "project";
