//! In-memory `HistoryWriter` test double (spec §8 "ambient test tooling").
//!
//! Grounded on the teacher's practice of keeping a lightweight in-process
//! test backend rather than a mocking framework (the teacher's own test
//! suites construct a `TestRepo`/in-memory settings object rather than
//! mocking the `Backend` trait).

use std::path::Path;
use std::path::PathBuf;

use crate::history_writer::HistoryWriter;
use crate::history_writer::HistoryWriterResult;
use crate::revision::Timestamp;

#[derive(Debug, Clone)]
pub struct MemoryCommit {
    pub author: String,
    pub email: String,
    pub message: String,
    pub timestamp: Timestamp,
    /// Snapshot of every path ever staged up to and including this commit,
    /// good enough to assert tree shape in tests without a real tree diff.
    pub staged_since_last_commit: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct MemoryTag {
    pub name: String,
    pub tagger_name: String,
    pub tagger_email: String,
    pub message: String,
    pub points_at_commit: usize,
}

#[derive(Default)]
pub struct MemoryHistoryWriter {
    pub commits: Vec<MemoryCommit>,
    pub tags: Vec<MemoryTag>,
    pub initialized: bool,
    pub disposed: bool,
    staged: Vec<PathBuf>,
}

impl MemoryHistoryWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryWriter for MemoryHistoryWriter {
    fn init(&mut self) -> HistoryWriterResult<()> {
        self.initialized = true;
        Ok(())
    }

    fn set_commit_encoding(&mut self, _encoding: &'static encoding_rs::Encoding) -> HistoryWriterResult<()> {
        Ok(())
    }

    fn add_all(&mut self, paths: &[PathBuf]) -> HistoryWriterResult<()> {
        for p in paths {
            if !self.staged.contains(p) {
                self.staged.push(p.clone());
            }
        }
        Ok(())
    }

    fn remove(&mut self, path: &Path, _recursive: bool) -> HistoryWriterResult<()> {
        let owned = path.to_path_buf();
        if !self.staged.contains(&owned) {
            self.staged.push(owned);
        }
        Ok(())
    }

    fn rename(&mut self, src: &Path, dst: &Path) -> HistoryWriterResult<()> {
        self.add_all(&[src.to_path_buf(), dst.to_path_buf()])
    }

    fn commit(
        &mut self,
        name: &str,
        email: &str,
        comment: &str,
        timestamp: Timestamp,
    ) -> HistoryWriterResult<bool> {
        if self.staged.is_empty() {
            return Ok(false);
        }
        self.commits.push(MemoryCommit {
            author: name.to_string(),
            email: email.to_string(),
            message: comment.to_string(),
            timestamp,
            staged_since_last_commit: std::mem::take(&mut self.staged),
        });
        Ok(true)
    }

    fn tag(
        &mut self,
        name: &str,
        tagger_name: &str,
        tagger_email: &str,
        message: &str,
        _timestamp: Timestamp,
    ) -> HistoryWriterResult<()> {
        self.tags.push(MemoryTag {
            name: name.to_string(),
            tagger_name: tagger_name.to_string(),
            tagger_email: tagger_email.to_string(),
            message: message.to_string(),
            points_at_commit: self.commits.len().saturating_sub(1),
        });
        Ok(())
    }

    fn dispose(&mut self) -> HistoryWriterResult<()> {
        self.disposed = true;
        Ok(())
    }
}
