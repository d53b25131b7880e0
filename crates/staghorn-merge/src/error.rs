//! Error types for the merge engine.
//!
//! Parsing, merging and rendering are total; only splitting can fail.

/// Errors returned by the provenance splitter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvenanceError {
    /// The document carries no `staghorn:source` markers, so there is
    /// nothing to split on.
    #[error("no provenance markers found; re-sync with annotation enabled before splitting")]
    NoMarkers,
}
