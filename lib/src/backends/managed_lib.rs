//! `managed-lib` backend (spec §4.5.1): drives an embedded library instead
//! of spawning a process. Implemented to the point of opening/initializing
//! a repository and staging/committing through `git2`; kept minimal because
//! the library surface itself is an external collaborator per spec §1.

use std::path::Path;
use std::path::PathBuf;

use git2::IndexAddOption;
use git2::Repository;
use git2::Signature;
use git2::Time;

use crate::history_writer::HistoryWriter;
use crate::history_writer::HistoryWriterError;
use crate::history_writer::HistoryWriterResult;
use crate::revision::Timestamp;

pub struct ManagedLibWriter {
    work_dir: PathBuf,
    repo: Option<Repository>,
}

impl ManagedLibWriter {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self { work_dir: work_dir.into(), repo: None }
    }

    fn repo(&self) -> HistoryWriterResult<&Repository> {
        self.repo.as_ref().ok_or_else(|| HistoryWriterError::Init("repository not initialized".into()))
    }

    fn signature(name: &str, email: &str, timestamp: Timestamp) -> HistoryWriterResult<Signature<'static>> {
        let time = Time::new(timestamp.epoch_secs(), 0);
        Signature::new(name, email, &time).map_err(|e| HistoryWriterError::Failed(e.to_string()))
    }
}

impl HistoryWriter for ManagedLibWriter {
    fn init(&mut self) -> HistoryWriterResult<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        let repo = Repository::init(&self.work_dir).map_err(|e| HistoryWriterError::Init(e.to_string()))?;
        self.repo = Some(repo);
        Ok(())
    }

    fn set_commit_encoding(&mut self, _encoding: &'static encoding_rs::Encoding) -> HistoryWriterResult<()> {
        // git2 always writes commit objects as the caller-supplied bytes;
        // there is no separate encoding declaration to make here.
        Ok(())
    }

    fn add_all(&mut self, paths: &[PathBuf]) -> HistoryWriterResult<()> {
        let repo = self.repo()?;
        let mut index = repo.index().map_err(|e| HistoryWriterError::Failed(e.to_string()))?;
        if paths.is_empty() {
            index
                .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
                .map_err(|e| HistoryWriterError::Failed(e.to_string()))?;
        } else {
            for path in paths {
                let relative = path.strip_prefix(&self.work_dir).unwrap_or(path);
                if self.work_dir.join(relative).exists() {
                    index.add_path(relative).map_err(|e| HistoryWriterError::Failed(e.to_string()))?;
                } else {
                    let _ = index.remove_path(relative);
                }
            }
        }
        index.write().map_err(|e| HistoryWriterError::Failed(e.to_string()))?;
        Ok(())
    }

    fn remove(&mut self, path: &Path, _recursive: bool) -> HistoryWriterResult<()> {
        let repo = self.repo()?;
        let mut index = repo.index().map_err(|e| HistoryWriterError::Failed(e.to_string()))?;
        let relative = path.strip_prefix(&self.work_dir).unwrap_or(path);
        let _ = index.remove_path(relative);
        index.write().map_err(|e| HistoryWriterError::Failed(e.to_string()))?;
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
        let repo = self.repo()?;
        let mut index = repo.index().map_err(|e| HistoryWriterError::Failed(e.to_string()))?;
        let tree_id = index.write_tree().map_err(|e| HistoryWriterError::Failed(e.to_string()))?;
        let tree = repo.find_tree(tree_id).map_err(|e| HistoryWriterError::Failed(e.to_string()))?;

        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        if let Some(parent) = &parent
            && parent.tree_id() == tree_id
        {
            return Ok(false);
        }

        let signature = Self::signature(name, email, timestamp)?;
        let parents: Vec<_> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, comment, &tree, &parents)
            .map_err(|e| HistoryWriterError::Failed(e.to_string()))?;
        Ok(true)
    }

    fn tag(
        &mut self,
        name: &str,
        tagger_name: &str,
        tagger_email: &str,
        message: &str,
        timestamp: Timestamp,
    ) -> HistoryWriterResult<()> {
        let repo = self.repo()?;
        let head_commit = repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| HistoryWriterError::Failed(e.to_string()))?;
        let tagger = Self::signature(tagger_name, tagger_email, timestamp)?;
        repo.tag(name, head_commit.as_object(), &tagger, message, false)
            .map_err(|e| HistoryWriterError::Failed(e.to_string()))?;
        Ok(())
    }

    fn dispose(&mut self) -> HistoryWriterResult<()> {
        self.repo = None;
        Ok(())
    }
}
