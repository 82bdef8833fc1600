//! The top-level error composing every component's own error type (spec §7
//! "Error handling — exit codes"), so the CLI can match on kind alone to
//! choose a process exit code without reaching into component internals.
//!
//! Grounded on the teacher's `CommandError`-style top enum (one variant per
//! subsystem, each wrapping that subsystem's dedicated error via `#[from]`).

use thiserror::Error;

use crate::config::ConfigError;
use crate::history_writer::HistoryWriterError;
use crate::legacy_db::LegacyDbError;
use crate::path_mapper::PathMapperError;
use crate::replay::ReplayError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("legacy database error: {0}")]
    LegacyDb(#[from] LegacyDbError),
    #[error("path mapper error: {0}")]
    PathMapper(#[from] PathMapperError),
    #[error("history writer error: {0}")]
    HistoryWriter(#[from] HistoryWriterError),
    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),
}

impl MigrationError {
    /// Process exit code (spec §7 "Exit codes (CLI surface)"): 0 success,
    /// 1 aborted by user, 2 fatal configuration error, 3 content/data
    /// errors encountered but ignored.
    ///
    /// A run only ever aborts (1) when `ignoreErrors=false`: under that
    /// policy every writer/analyzer/replay failure is a hard abort (spec
    /// §4.6), so any non-configuration error reaching this point is, by
    /// construction, the user's own choice not to run unattended. Code 3
    /// is not produced here: it is a property of a *successful* run
    /// (`Summary::errors_ignored > 0`), decided by the caller, not an
    /// error variant.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::LegacyDb(_) | Self::PathMapper(_) | Self::HistoryWriter(_) | Self::Replay(_) => 1,
        }
    }
}
