//! Core engine for replaying a legacy file-versioning database into a
//! content-addressed history graph.
//!
//! [`run_migration`] wires the whole pipeline: a caller-supplied
//! [`LegacyDatabase`] feeds [`RevisionAnalyzer`], whose sorted revision
//! stream feeds [`ChangesetBuilder`], whose changesets feed [`ReplayEngine`]
//! against a [`HistoryWriter`] backend chosen by [`MigrationConfig::backend`].

pub mod action;
pub mod analyzer;
pub mod backends;
pub mod changeset;
pub mod config;
pub mod error;
pub mod error_policy;
pub mod exclude;
pub mod history_writer;
pub mod ids;
pub mod json_db;
pub mod legacy_db;
pub mod path;
pub mod path_mapper;
pub mod replay;
pub mod revision;

use tracing::info;
use tracing::instrument;

use crate::analyzer::RevisionAnalyzer;
use crate::backends::memory::MemoryHistoryWriter;
use crate::backends::native_process::NativeProcessWriter;
use crate::backends::streaming_pipe::StreamingPipeWriter;
use crate::changeset::ChangesetBuilder;
use crate::config::BackendKind;
use crate::config::ConfigError;
use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::history_writer::HistoryWriter;
use crate::legacy_db::LegacyDatabase;
use crate::replay::ReplayEngine;
use crate::replay::RootMapping;
use crate::replay::Summary;

#[cfg(feature = "git")]
use crate::backends::managed_lib::ManagedLibWriter;

fn build_writer(config: &MigrationConfig) -> Result<Box<dyn HistoryWriter>, MigrationError> {
    match config.backend {
        BackendKind::NativeProcess => Ok(Box::new(NativeProcessWriter::new(&config.target_dir))),
        BackendKind::StreamingPipe => Ok(Box::new(StreamingPipeWriter::new())),
        #[cfg(feature = "git")]
        BackendKind::ManagedLib => Ok(Box::new(ManagedLibWriter::new(&config.target_dir))),
        #[cfg(not(feature = "git"))]
        BackendKind::ManagedLib => Err(MigrationError::Config(ConfigError::BackendUnavailable("managed-lib"))),
    }
}

/// Runs one full migration: validates `config`, scans `db` for in-scope
/// revisions, clusters them into changesets, and replays them against the
/// configured [`HistoryWriter`] backend (spec §5 "Pipeline").
#[instrument(skip(db, config), fields(backend = ?config.backend))]
pub fn run_migration(config: &MigrationConfig, db: &dyn LegacyDatabase) -> Result<Summary, MigrationError> {
    config.validate()?;
    let excludes = config.exclude_list()?;

    let analyzed = RevisionAnalyzer::new(db, &excludes).analyze(&config.root_projects);
    info!(
        revision_count = analyzed.revision_count,
        file_count = analyzed.file_count,
        destroyed_count = analyzed.destroyed.len(),
        "analysis complete"
    );

    let changesets =
        ChangesetBuilder::new(config.any_comment_window_secs, config.same_comment_window_secs)
            .build(analyzed.sorted_revisions.as_slice());
    info!(changeset_count = changesets.len(), "changesets clustered");

    let roots: Vec<RootMapping> = analyzed
        .root_projects
        .iter()
        .map(|id| {
            let logical_name = db.item(id).map(|item| item.logical_name).unwrap_or_else(|_| id.as_str().to_string());
            RootMapping { id: id.clone(), logical_name }
        })
        .collect();

    // `init` is idempotent (spec §4.5), so it is safe to call it here to
    // unlock `set_commit_encoding` ahead of time and again inside
    // `ReplayEngine::run`.
    let mut writer = build_writer(config)?;
    writer.init()?;
    if config.transcode_comments {
        writer.set_commit_encoding(config.source_encoding)?;
    }

    let mut engine = ReplayEngine::new(
        db,
        writer,
        &config.target_dir,
        &roots,
        config.export_project_to_git_root,
        config.email_domain.clone(),
        config.default_comment.clone(),
        config.force_annotated_tags,
        config.from_date,
        config.to_date,
        config.commit_interval,
        config.ignore_errors,
    );
    let summary = engine.run(&changesets)?;
    info!(
        changesets_committed = summary.changesets_committed,
        tags_created = summary.tags_created,
        errors_ignored = summary.errors_ignored,
        "migration complete"
    );
    Ok(summary)
}

/// An in-memory [`HistoryWriter`] suitable for tests and dry runs, not
/// selectable through [`MigrationConfig::backend`] (spec §8).
pub fn memory_writer() -> Box<dyn HistoryWriter> {
    Box::new(MemoryHistoryWriter::new())
}
