//! Pipeline orchestration for staghorn
//!
//! - `sync`: resolve layers, merge, write the managed output
//! - `info`: same resolution, report instead of write
//! - `apply`: split an edited merged document back into layer files

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use staghorn_merge::{
    merge_with_report, split, HeaderCollision, MergeOptions, MergeOutcome, ProvenanceError,
    PERSONAL, PROJECT, TEAM,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::{CacheError, Freshness, TeamCache, TeamResolution};
use crate::config::{ConfigError, EffectiveConfig, Settings};
use crate::languages::{select, Detector, LanguageSelection};
use crate::output::{write_layer, write_managed, OutputError, OutputLedger, WriteOutcome};
use crate::paths::{Paths, ProjectPaths};
use crate::sources::{read_optional, resolve, LayerDir, LayerOrigin, ResolvedSources, SourceError};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("team cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Output(#[from] OutputError),

    #[error("{0}")]
    Provenance(#[from] ProvenanceError),

    #[error("language detection failed: {0}")]
    Detection(String),

    #[error("{0} is not a staghorn project (no .staghorn directory)")]
    NotAProject(PathBuf),

    #[error("nothing to merge: no team, personal or project content found")]
    NothingToMerge,
}

impl PipelineError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Provenance(_) => 2,
            PipelineError::Output(OutputError::Unmanaged(_)) => 3,
            _ => 1,
        }
    }

    /// Suggested next step, if any
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            PipelineError::Provenance(ProvenanceError::NoMarkers) => Some(
                "hint: only annotated output can be applied; run `staghorn sync` without --no-annotate and edit that file",
            ),
            PipelineError::Output(OutputError::Unmanaged(_)) => {
                Some("hint: move your file into the personal or project layer, or pass --force")
            }
            PipelineError::NotAProject(_) => Some("hint: create a .staghorn directory in the project root"),
            _ => None,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Which output is being produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// `~/.claude/CLAUDE.md` from team + personal
    Global,
    /// `<project>/CLAUDE.md` from team + personal + project
    Project,
}

/// Loaded configuration and layout for one invocation
#[derive(Debug, Clone)]
pub struct Workspace {
    pub paths: Paths,
    pub project: ProjectPaths,
    pub config: EffectiveConfig,
    pub settings: Settings,
}

impl Workspace {
    /// Load the layered config for `project_root`
    pub fn load(
        paths: Paths,
        project_root: impl Into<PathBuf>,
        cli_overrides: Option<Value>,
    ) -> PipelineResult<Self> {
        let project = ProjectPaths::new(project_root);
        let config = EffectiveConfig::build(
            Some(&paths.config_file()),
            Some(&project.config_file()),
            cli_overrides,
        )?;
        let settings = config.settings()?;
        Ok(Self {
            paths,
            project,
            config,
            settings,
        })
    }

    pub fn team_cache(&self) -> TeamCache {
        TeamCache::new(self.paths.team_cache_dir())
    }

    /// Configured team source directory, `~` expanded
    pub fn team_source(&self) -> Option<PathBuf> {
        self.settings.team.source.as_deref().map(|s| self.paths.expand(s))
    }

    pub fn output_path(&self, scope: Scope) -> PathBuf {
        match scope {
            Scope::Global => self.paths.global_output(),
            Scope::Project => self.project.output(),
        }
    }

    /// Active languages. Detection only applies to project output.
    pub fn languages(&self, scope: Scope) -> PipelineResult<LanguageSelection> {
        let detected = if scope == Scope::Project && self.settings.languages.auto_detect {
            let detector = Detector::new().map_err(|e| PipelineError::Detection(e.to_string()))?;
            detector
                .detect(&self.project.root)
                .map_err(|e| PipelineError::Detection(e.to_string()))?
        } else {
            Vec::new()
        };
        Ok(select(&self.settings.languages, detected))
    }

    /// Make sure the team snapshot is usable
    pub fn resolve_team(&self, refresh: bool) -> PipelineResult<TeamResolution> {
        let source = self.team_source();
        let resolution = self.team_cache().ensure(
            source.as_deref(),
            self.settings.cache.ttl_seconds,
            refresh,
            Utc::now(),
        )?;
        match &resolution {
            TeamResolution::Unavailable => {
                warn!("no team source configured or cached; merging without team layer")
            }
            TeamResolution::Cached { stale: true, meta } => {
                warn!(fetched_at = %meta.fetched_at, "using stale team snapshot")
            }
            _ => {}
        }
        Ok(resolution)
    }

    /// Layer directories in merge order
    pub fn layer_dirs(&self, scope: Scope, team: &TeamResolution) -> Vec<LayerDir> {
        let mut dirs = Vec::new();
        if !matches!(team, TeamResolution::Unavailable) {
            let layout = self.team_cache().layout();
            dirs.push(LayerDir::new(TEAM, layout.claude_file(), layout.languages_dir()));
        }
        dirs.push(LayerDir::new(
            PERSONAL,
            self.paths.personal_file(),
            self.paths.personal_languages_dir(),
        ));
        if scope == Scope::Project {
            dirs.push(LayerDir::new(
                PROJECT,
                self.project.project_file(),
                self.project.languages_dir(),
            ));
        }
        dirs
    }

    /// Resolve every input and merge
    pub fn compose(
        &self,
        scope: Scope,
        refresh: bool,
        today: NaiveDate,
    ) -> PipelineResult<Composition> {
        if scope == Scope::Project && !self.project.is_initialized() {
            return Err(PipelineError::NotAProject(self.project.root.clone()));
        }

        let team = self.resolve_team(refresh)?;
        let mut sources = resolve(&self.layer_dirs(scope, &team))?;
        let languages = self.languages(scope)?;
        sources.retain_languages(&languages.active);

        let mut options = MergeOptions::default().with_languages(
            languages.active.clone(),
            sources.language_files.clone(),
        );
        options.annotate = self.settings.output.annotate;
        if options.annotate {
            options.date = Some(today);
            options.source_repo = self.settings.team.repo.clone();
        }

        let outcome = merge_with_report(&sources.layers, &options);
        for collision in &outcome.report.collisions {
            warn!(
                existing = %collision.existing,
                incoming = %collision.incoming,
                source = %collision.source,
                "header differs only by case; merged into existing section"
            );
        }
        for source in &outcome.report.ignored_preambles {
            warn!(%source, "text before the first '##' header of this layer is not merged");
        }

        Ok(Composition {
            scope,
            output_path: self.output_path(scope),
            team,
            sources,
            languages,
            outcome,
        })
    }
}

/// Everything produced by one merge
#[derive(Debug, Clone)]
pub struct Composition {
    pub scope: Scope,
    pub output_path: PathBuf,
    pub team: TeamResolution,
    pub sources: ResolvedSources,
    pub languages: LanguageSelection,
    pub outcome: MergeOutcome,
}

/// Options for `sync`
#[derive(Debug, Clone, Copy)]
pub struct SyncRequest {
    pub scope: Scope,
    pub force: bool,
    pub refresh: bool,
    pub dry_run: bool,
    pub today: NaiveDate,
}

/// Result of `sync`
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub scope: Scope,
    pub output: PathBuf,
    pub outcome: WriteOutcome,
    pub layers: Vec<String>,
    pub sections: usize,
    pub languages: Vec<String>,
    #[serde(skip)]
    pub text: String,
}

/// Merge and write the managed output
pub fn sync(workspace: &Workspace, request: &SyncRequest) -> PipelineResult<SyncReport> {
    let composition = workspace.compose(request.scope, request.refresh, request.today)?;
    let text = composition.outcome.text.clone();
    if text.is_empty() {
        return Err(PipelineError::NothingToMerge);
    }

    let ledger = OutputLedger::new(workspace.paths.output_ledger());
    let outcome = write_managed(
        &composition.output_path,
        &text,
        request.force,
        request.dry_run,
        Some(&ledger),
    )?;
    info!(
        path = %composition.output_path.display(),
        outcome = outcome.describe(),
        "sync complete"
    );

    Ok(SyncReport {
        scope: request.scope,
        output: composition.output_path,
        outcome,
        layers: composition.sources.layers.iter().map(|l| l.source.clone()).collect(),
        sections: composition.outcome.document.sections.len(),
        languages: composition
            .languages
            .active
            .iter()
            .filter(|l| composition.sources.language_files.contains_key(*l))
            .cloned()
            .collect(),
        text,
    })
}

/// One merged section and the layer that owns it
#[derive(Debug, Clone, Serialize)]
pub struct SectionInfo {
    pub header: String,
    pub source: String,
    /// Layers that appended Additions blocks
    pub additions: Vec<String>,
}

/// Team source status
#[derive(Debug, Clone, Serialize)]
pub struct TeamInfo {
    pub source: Option<String>,
    pub repo: Option<String>,
    pub snapshot: Freshness,
}

/// Result of `info`
#[derive(Debug, Clone, Serialize)]
pub struct InfoReport {
    pub scope: Scope,
    pub output: PathBuf,
    pub team: TeamInfo,
    pub layers: Vec<LayerOrigin>,
    pub base_source: Option<String>,
    pub sections: Vec<SectionInfo>,
    pub languages: LanguageSelection,
    pub collisions: Vec<HeaderCollision>,
    pub ignored_preambles: Vec<String>,
}

impl InfoReport {
    /// Human-readable rendering
    pub fn to_human(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Output: {} ({:?})", self.output.display(), self.scope));
        lines.push(format!(
            "Team source: {}",
            self.team.source.as_deref().unwrap_or("(not configured)")
        ));
        if let Some(repo) = &self.team.repo {
            lines.push(format!("Team repo: {repo}"));
        }
        lines.push(format!("Team snapshot: {}", describe_freshness(&self.team.snapshot)));
        lines.push(String::new());

        lines.push("Layers:".to_string());
        for layer in &self.layers {
            let state = if layer.present {
                format!("{} bytes", layer.bytes)
            } else {
                "missing".to_string()
            };
            lines.push(format!("  {:<10} {} ({})", layer.source, layer.path.display(), state));
        }
        lines.push(String::new());

        if self.sections.is_empty() {
            lines.push("Sections: none".to_string());
        } else {
            lines.push("Sections:".to_string());
            for section in &self.sections {
                let mut line = format!("  [{}] {}", section.source, section.header);
                if !section.additions.is_empty() {
                    line.push_str(&format!(" (+ {})", section.additions.join(", ")));
                }
                lines.push(line);
            }
        }
        lines.push(String::new());

        lines.push(format!("Languages: {}", join_or_none(&self.languages.active)));

        if !self.collisions.is_empty() {
            lines.push(String::new());
            lines.push("Header case collisions:".to_string());
            for c in &self.collisions {
                lines.push(format!("  '{}' from {} merged into '{}'", c.incoming, c.source, c.existing));
            }
        }
        if !self.ignored_preambles.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                "Ignored text before first section in: {}",
                self.ignored_preambles.join(", ")
            ));
        }

        lines.join("\n")
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn describe_freshness(freshness: &Freshness) -> String {
    match freshness {
        Freshness::Fresh { age_seconds } => format!("fresh ({age_seconds}s old)"),
        Freshness::Stale { age_seconds } => format!("stale ({age_seconds}s old)"),
        Freshness::Missing => "none".to_string(),
    }
}

/// Report what a merge would produce, without writing
pub fn info(workspace: &Workspace, scope: Scope, today: NaiveDate) -> PipelineResult<InfoReport> {
    let composition = workspace.compose(scope, false, today)?;
    let snapshot = workspace
        .team_cache()
        .freshness(workspace.settings.cache.ttl_seconds, Utc::now())?;

    let sections = composition
        .outcome
        .document
        .sections
        .iter()
        .map(|s| SectionInfo {
            header: s.header.clone(),
            source: s
                .source
                .clone()
                .or_else(|| composition.outcome.report.base_source.clone())
                .unwrap_or_default(),
            additions: composition
                .sources
                .layers
                .iter()
                .map(|l| l.source.clone())
                .filter(|src| {
                    s.content
                        .lines()
                        .any(|line| line.trim() == staghorn_merge::additions_header(src))
                })
                .collect(),
        })
        .collect();

    Ok(InfoReport {
        scope,
        output: composition.output_path,
        team: TeamInfo {
            source: workspace.settings.team.source.clone(),
            repo: workspace.settings.team.repo.clone(),
            snapshot,
        },
        layers: composition.sources.origins,
        base_source: composition.outcome.report.base_source,
        sections,
        languages: composition.languages,
        collisions: composition.outcome.report.collisions,
        ignored_preambles: composition.outcome.report.ignored_preambles,
    })
}

/// One file written (or not) by `apply`
#[derive(Debug, Clone, Serialize)]
pub struct AppliedFile {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub path: PathBuf,
    pub outcome: WriteOutcome,
}

/// A source found in the document that was not written
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSource {
    pub source: String,
    pub reason: String,
}

/// Result of `apply`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub sources: Vec<String>,
    pub files: Vec<AppliedFile>,
    pub skipped: Vec<SkippedSource>,
}

/// Where a writable layer lives
fn layer_targets(workspace: &Workspace, source: &str) -> Option<(PathBuf, PathBuf)> {
    match source {
        PERSONAL => Some((
            workspace.paths.personal_file(),
            workspace.paths.personal_languages_dir(),
        )),
        PROJECT => Some((
            workspace.project.project_file(),
            workspace.project.languages_dir(),
        )),
        _ => None,
    }
}

/// Split an edited, annotated merged document and write each layer back.
///
/// Layer text the merge never carried (an overlay preamble, blank sections)
/// is kept from the current file. The team layer is shared and never written.
pub fn apply(workspace: &Workspace, text: &str, dry_run: bool) -> PipelineResult<ApplyReport> {
    let document = split(text)?;
    let mut report = ApplyReport {
        sources: document.sources.clone(),
        ..ApplyReport::default()
    };

    for source in &document.sources {
        if source == TEAM {
            report.skipped.push(SkippedSource {
                source: source.clone(),
                reason: "team source is shared; edit it upstream".to_string(),
            });
            continue;
        }
        let Some((file, languages_dir)) = layer_targets(workspace, source) else {
            report.skipped.push(SkippedSource {
                source: source.clone(),
                reason: "unknown layer".to_string(),
            });
            continue;
        };
        if source == PROJECT && !workspace.project.is_initialized() {
            report.skipped.push(SkippedSource {
                source: source.clone(),
                reason: format!("{} has no .staghorn directory", workspace.project.root.display()),
            });
            continue;
        }

        if !document.restore(source).trim().is_empty() {
            let current = read_optional(&file)?.unwrap_or_default();
            let restored = document.restore_onto(source, &current);
            report.files.push(write_back(source, None, &file, &restored, dry_run)?);
        }

        for language in document.languages_for(source) {
            if let Some(content) = document.language_content(source, &language) {
                let path = languages_dir.join(format!("{language}.md"));
                report
                    .files
                    .push(write_back(source, Some(language.as_str()), &path, &content, dry_run)?);
            }
        }
    }

    Ok(report)
}

fn write_back(
    source: &str,
    language: Option<&str>,
    path: &Path,
    content: &str,
    dry_run: bool,
) -> PipelineResult<AppliedFile> {
    let outcome = write_layer(path, content, dry_run)?;
    info!(%source, path = %path.display(), outcome = outcome.describe(), "applied layer");
    Ok(AppliedFile {
        source: source.to_string(),
        language: language.map(str::to_string),
        path: path.to_path_buf(),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        home: PathBuf,
        team: PathBuf,
        project: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let team = dir.path().join("team");
        let project = dir.path().join("app");

        fs::create_dir_all(team.join("languages")).unwrap();
        fs::write(team.join("CLAUDE.md"), "# Standards\n\n## Code Style\n\nFormat code.\n\n## Testing\n\nWrite tests.").unwrap();
        fs::write(team.join("languages/rust.md"), "## Linting\n\nRun clippy.").unwrap();

        let config_dir = home.join(".config/staghorn");
        fs::create_dir_all(config_dir.join("languages")).unwrap();
        fs::write(
            config_dir.join("config.toml"),
            format!("[team]\nsource = \"{}\"\nrepo = \"acme/standards\"\n", team.display()),
        )
        .unwrap();
        fs::write(config_dir.join("personal.md"), "## code style\n\nI prefer tabs.\n\n## Editor\n\nUse helix.").unwrap();
        fs::write(config_dir.join("languages/rust.md"), "Prefer `?` over unwrap.").unwrap();

        fs::create_dir_all(project.join(".staghorn")).unwrap();
        fs::write(project.join("Cargo.toml"), "[package]").unwrap();
        fs::write(project.join(".staghorn/project.md"), "## Testing\n\nUse nextest.").unwrap();

        Fixture {
            _dir: dir,
            home,
            team,
            project,
        }
    }

    fn workspace(fx: &Fixture) -> Workspace {
        Workspace::load(Paths::rooted(&fx.home), &fx.project, None).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn request(scope: Scope) -> SyncRequest {
        SyncRequest {
            scope,
            force: false,
            refresh: false,
            dry_run: false,
            today: today(),
        }
    }

    #[test]
    fn test_global_sync_writes_team_and_personal() {
        let fx = fixture();
        let ws = workspace(&fx);
        let report = sync(&ws, &request(Scope::Global)).unwrap();

        assert_eq!(report.outcome, WriteOutcome::Created);
        assert_eq!(report.layers, vec!["team", "personal"]);
        assert!(report.languages.is_empty());

        let written = fs::read_to_string(fx.home.join(".claude/CLAUDE.md")).unwrap();
        assert!(written.starts_with(
            "<!-- Managed by staghorn | Source: acme/standards | Last synced: 2026-10-18 -->"
        ));
        assert!(written.contains("### Personal Additions\n\nI prefer tabs."));
        assert!(written.contains("## Editor"));
        assert!(!written.contains("Use nextest."));
    }

    #[test]
    fn test_project_sync_detects_languages() {
        let fx = fixture();
        let ws = workspace(&fx);
        let report = sync(&ws, &request(Scope::Project)).unwrap();

        assert_eq!(report.layers, vec!["team", "personal", "project"]);
        assert_eq!(report.languages, vec!["rust"]);

        let written = fs::read_to_string(fx.project.join("CLAUDE.md")).unwrap();
        assert!(written.contains("### Project Additions\n\nUse nextest."));
        assert!(written.contains("<!-- staghorn:source:team:rust -->\n## Rust\n\n### Linting"));
        assert!(written.contains("<!-- staghorn:source:personal:rust -->\n### Personal Additions"));
    }

    #[test]
    fn test_sync_is_idempotent() {
        let fx = fixture();
        let ws = workspace(&fx);
        sync(&ws, &request(Scope::Global)).unwrap();
        let again = sync(&ws, &request(Scope::Global)).unwrap();
        assert_eq!(again.outcome, WriteOutcome::Unchanged);
    }

    #[test]
    fn test_project_scope_requires_initialized_project() {
        let fx = fixture();
        fs::remove_dir_all(fx.project.join(".staghorn")).unwrap();
        let ws = workspace(&fx);
        let err = sync(&ws, &request(Scope::Project)).unwrap_err();
        assert!(matches!(err, PipelineError::NotAProject(_)));
    }

    #[test]
    fn test_sync_refuses_unmanaged_output() {
        let fx = fixture();
        fs::create_dir_all(fx.home.join(".claude")).unwrap();
        fs::write(fx.home.join(".claude/CLAUDE.md"), "# mine").unwrap();
        let ws = workspace(&fx);

        let err = sync(&ws, &request(Scope::Global)).unwrap_err();
        assert_eq!(err.exit_code(), 3);

        let forced = SyncRequest {
            force: true,
            ..request(Scope::Global)
        };
        assert_eq!(sync(&ws, &forced).unwrap().outcome, WriteOutcome::Updated);
    }

    #[test]
    fn test_plain_output_can_be_resynced() {
        let fx = fixture();
        fs::write(
            fx.home.join(".config/staghorn/config.toml"),
            format!("[team]\nsource = \"{}\"\n\n[output]\nannotate = false\n", fx.team.display()),
        )
        .unwrap();
        let ws = workspace(&fx);
        assert_eq!(sync(&ws, &request(Scope::Global)).unwrap().outcome, WriteOutcome::Created);
        assert!(!fs::read_to_string(ws.paths.global_output()).unwrap().contains("staghorn"));

        fs::write(ws.paths.personal_file(), "## Editor\n\nUse zed.").unwrap();
        assert_eq!(sync(&ws, &request(Scope::Global)).unwrap().outcome, WriteOutcome::Updated);
        assert!(fs::read_to_string(ws.paths.global_output()).unwrap().contains("Use zed."));

        fs::write(ws.paths.global_output(), "# hand edited\n").unwrap();
        let err = sync(&ws, &request(Scope::Global)).unwrap_err();
        assert!(matches!(err, PipelineError::Output(OutputError::Unmanaged(_))));
    }

    #[test]
    fn test_team_snapshot_used_when_source_disappears() {
        let fx = fixture();
        let ws = workspace(&fx);
        sync(&ws, &request(Scope::Global)).unwrap();

        fs::remove_dir_all(&fx.team).unwrap();
        let report = sync(&ws, &request(Scope::Global)).unwrap();
        assert_eq!(report.layers, vec!["team", "personal"]);
        assert_eq!(report.outcome, WriteOutcome::Unchanged);
    }

    #[test]
    fn test_info_reports_sections_and_collisions() {
        let fx = fixture();
        let ws = workspace(&fx);
        let report = info(&ws, Scope::Project, today()).unwrap();

        let headers: Vec<(&str, &str)> = report
            .sections
            .iter()
            .map(|s| (s.header.as_str(), s.source.as_str()))
            .collect();
        assert_eq!(
            headers,
            vec![("Code Style", "team"), ("Testing", "team"), ("Editor", "personal")]
        );
        assert_eq!(report.sections[0].additions, vec!["personal"]);
        assert_eq!(report.sections[1].additions, vec!["project"]);
        assert_eq!(report.collisions.len(), 1);
        assert_eq!(report.collisions[0].incoming, "code style");
        assert!(report.team.snapshot.is_fresh());

        let human = report.to_human();
        assert!(human.contains("[team] Code Style (+ personal)"));
        assert!(human.contains("Languages: rust"));
    }

    #[test]
    fn test_apply_writes_personal_and_project_layers() {
        let fx = fixture();
        let ws = workspace(&fx);
        let merged = sync(&ws, &request(Scope::Project)).unwrap().text;

        let edited = merged
            .replace("I prefer tabs.", "I prefer two-space indents.")
            .replace("Use nextest.", "Use cargo nextest run.")
            .replace("Prefer `?` over unwrap.", "Never unwrap in library code.");
        let report = apply(&ws, &edited, false).unwrap();

        assert_eq!(report.sources, vec!["team", "personal", "project"]);
        assert_eq!(report.skipped[0].source, "team");

        let personal = fs::read_to_string(ws.paths.personal_file()).unwrap();
        assert_eq!(
            personal,
            "## code style\n\nI prefer two-space indents.\n\n## Editor\n\nUse helix.\n"
        );
        let project = fs::read_to_string(ws.project.project_file()).unwrap();
        assert_eq!(project, "## Testing\n\nUse cargo nextest run.\n");
        let rust = fs::read_to_string(ws.paths.personal_languages_dir().join("rust.md")).unwrap();
        assert_eq!(rust, "Never unwrap in library code.\n");

        let team = fs::read_to_string(fx.team.join("CLAUDE.md")).unwrap();
        assert!(team.contains("Format code."));
    }

    #[test]
    fn test_apply_without_markers() {
        let fx = fixture();
        let ws = workspace(&fx);
        let err = apply(&ws, "## Plain\n\ntext", false).unwrap_err();
        assert!(matches!(err, PipelineError::Provenance(ProvenanceError::NoMarkers)));
        assert_eq!(err.exit_code(), 2);
    }
}
