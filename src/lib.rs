//! staghorn - layered CLAUDE.md composition
//!
//! Resolves the team, personal and project markdown layers, merges them
//! with `staghorn-merge`, and writes the managed output. Annotated output
//! can be edited and applied back to the layers it came from.

pub mod cache;
pub mod config;
pub mod languages;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod sources;

pub use cache::{CacheError, CacheMeta, Freshness, TeamCache, TeamResolution};
pub use config::{ConfigError, EffectiveConfig, Settings};
pub use languages::{select, Detector, LanguageSelection};
pub use output::{write_layer, write_managed, OutputError, OutputLedger, WriteOutcome};
pub use paths::{Paths, PathsError, ProjectPaths, TeamPaths};
pub use pipeline::{
    apply, info, sync, ApplyReport, InfoReport, PipelineError, PipelineResult, Scope, SyncReport,
    SyncRequest, Workspace,
};
pub use sources::{resolve, LayerDir, ResolvedSources, SourceError};
