//! `HistoryWriter` (spec §4.5, component F): the backend-neutral contract
//! that `ReplayEngine` drives. Concrete backends live under
//! [`crate::backends`].
//!
//! Grounded on `backend.rs`'s `Backend` trait shape (one trait, one error
//! enum, every method returns a component-scoped `Result`), but synchronous
//! for the same reason [`crate::legacy_db::LegacyDatabase`] is: spec §5
//! mandates strictly serial, blocking writer calls with no suspension.

use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::revision::Timestamp;

#[derive(Debug, Error)]
pub enum HistoryWriterError {
    #[error("backend initialization failed: {0}")]
    Init(String),
    #[error("backend does not implement this operation: {0}")]
    Unsupported(&'static str),
    #[error("backend call failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type HistoryWriterResult<T> = Result<T, HistoryWriterError>;

/// Backend-neutral writer for the target history (spec §4.5). All paths
/// passed to these methods are absolute inside the working directory the
/// backend was initialized against.
pub trait HistoryWriter {
    /// Idempotent on an empty target; prepares to accept writes.
    fn init(&mut self) -> HistoryWriterResult<()>;

    /// Declares the encoding of commit messages passed to subsequent
    /// `commit`/`tag` calls.
    fn set_commit_encoding(&mut self, encoding: &'static encoding_rs::Encoding) -> HistoryWriterResult<()>;

    /// Stages a subset of changed paths. `paths` may include paths that no
    /// longer exist on disk, to signal a deletion.
    fn add_all(&mut self, paths: &[PathBuf]) -> HistoryWriterResult<()>;

    /// Stages a delete.
    fn remove(&mut self, path: &Path, recursive: bool) -> HistoryWriterResult<()>;

    /// Stages a move.
    fn rename(&mut self, src: &Path, dst: &Path) -> HistoryWriterResult<()>;

    /// Commits staged changes. Returns `false` if the net tree diff against
    /// the parent commit is empty (spec §4.5: a no-op commit is never
    /// counted by `ReplayEngine`).
    fn commit(
        &mut self,
        name: &str,
        email: &str,
        comment: &str,
        timestamp: Timestamp,
    ) -> HistoryWriterResult<bool>;

    /// Creates an annotated tag pointing at the most recent commit.
    fn tag(
        &mut self,
        name: &str,
        tagger_name: &str,
        tagger_email: &str,
        message: &str,
        timestamp: Timestamp,
    ) -> HistoryWriterResult<()>;

    /// Optional compaction/flush hint, called every `commitInterval` commits.
    fn checkpoint(&mut self) -> HistoryWriterResult<()> {
        Ok(())
    }

    /// Flush & finalize. Critical for streaming backends; called on every
    /// exit path from `ReplayEngine` (spec §5 "scoped acquisition").
    fn dispose(&mut self) -> HistoryWriterResult<()> {
        Ok(())
    }
}
