//! `streaming-pipe` backend (spec §4.5.1): intended to feed a fast-import
//! style protocol over a pipe to a receiving process. Stubbed: `init` and
//! `dispose` work, everything else returns
//! [`HistoryWriterError::Unsupported`]. This is an explicit, logged
//! limitation rather than a silent gap — the distilled spec scopes concrete
//! backends beyond `native-process` out of this build (§1).

use std::path::Path;
use std::path::PathBuf;

use tracing::warn;

use crate::history_writer::HistoryWriter;
use crate::history_writer::HistoryWriterError;
use crate::history_writer::HistoryWriterResult;
use crate::revision::Timestamp;

pub struct StreamingPipeWriter {
    initialized: bool,
}

impl StreamingPipeWriter {
    pub fn new() -> Self {
        Self { initialized: false }
    }
}

impl Default for StreamingPipeWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryWriter for StreamingPipeWriter {
    fn init(&mut self) -> HistoryWriterResult<()> {
        warn!("streaming-pipe backend has no fast-import encoder yet; only init/dispose work");
        self.initialized = true;
        Ok(())
    }

    fn set_commit_encoding(&mut self, _encoding: &'static encoding_rs::Encoding) -> HistoryWriterResult<()> {
        Err(HistoryWriterError::Unsupported("setCommitEncoding"))
    }

    fn add_all(&mut self, _paths: &[PathBuf]) -> HistoryWriterResult<()> {
        Err(HistoryWriterError::Unsupported("addAll"))
    }

    fn remove(&mut self, _path: &Path, _recursive: bool) -> HistoryWriterResult<()> {
        Err(HistoryWriterError::Unsupported("remove"))
    }

    fn rename(&mut self, _src: &Path, _dst: &Path) -> HistoryWriterResult<()> {
        Err(HistoryWriterError::Unsupported("move"))
    }

    fn commit(
        &mut self,
        _name: &str,
        _email: &str,
        _comment: &str,
        _timestamp: Timestamp,
    ) -> HistoryWriterResult<bool> {
        Err(HistoryWriterError::Unsupported("commit"))
    }

    fn tag(
        &mut self,
        _name: &str,
        _tagger_name: &str,
        _tagger_email: &str,
        _message: &str,
        _timestamp: Timestamp,
    ) -> HistoryWriterResult<()> {
        Err(HistoryWriterError::Unsupported("tag"))
    }

    fn dispose(&mut self) -> HistoryWriterResult<()> {
        self.initialized = false;
        Ok(())
    }
}
