//! `native-process` backend (spec §4.5.1): drives a real `git` executable as
//! a child process.
//!
//! Grounded on `git_subprocess.rs`'s `Command`-building and stderr-capturing
//! style (`create_command`/`spawn_cmd`/`wait_with_output`), trimmed to the
//! plain synchronous case: this backend never streams progress, so there is
//! no need for the teacher's background stderr-draining thread.

use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::process::Stdio;

use bstr::ByteSlice as _;
use tracing::debug;
use tracing::instrument;

use crate::history_writer::HistoryWriter;
use crate::history_writer::HistoryWriterError;
use crate::history_writer::HistoryWriterResult;
use crate::revision::Timestamp;

pub struct NativeProcessWriter {
    work_dir: PathBuf,
    git_executable: PathBuf,
    commit_count: u64,
}

impl NativeProcessWriter {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            git_executable: PathBuf::from("git"),
            commit_count: 0,
        }
    }

    pub fn with_git_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.git_executable = path.into();
        self
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.git_executable);
        cmd.current_dir(&self.work_dir)
            .args(args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn run(&self, args: &[&str]) -> HistoryWriterResult<Output> {
        debug!(?args, "running git subprocess");
        let output = self
            .command(args)
            .output()
            .map_err(|e| HistoryWriterError::Failed(format!("spawning git: {e}")))?;
        if !output.status.success() {
            return Err(HistoryWriterError::Failed(format!(
                "git {} failed: {}",
                args.join(" "),
                output.stderr.to_str_lossy()
            )));
        }
        Ok(output)
    }

    fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> HistoryWriterResult<Output> {
        let mut cmd = self.command(args);
        for (k, v) in env {
            cmd.env(k, v);
        }
        let output = cmd
            .output()
            .map_err(|e| HistoryWriterError::Failed(format!("spawning git: {e}")))?;
        if !output.status.success() {
            return Err(HistoryWriterError::Failed(format!(
                "git {} failed: {}",
                args.join(" "),
                output.stderr.to_str_lossy()
            )));
        }
        Ok(output)
    }

    fn has_staged_changes(&self) -> HistoryWriterResult<bool> {
        let status = self
            .command(&["diff", "--cached", "--quiet"])
            .status()
            .map_err(|e| HistoryWriterError::Failed(format!("spawning git: {e}")))?;
        Ok(!status.success())
    }
}

impl HistoryWriter for NativeProcessWriter {
    #[instrument(skip(self))]
    fn init(&mut self) -> HistoryWriterResult<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        self.run(&["init", "--quiet", "."])?;
        Ok(())
    }

    fn set_commit_encoding(&mut self, encoding: &'static encoding_rs::Encoding) -> HistoryWriterResult<()> {
        self.run(&["config", "i18n.commitEncoding", encoding.name()])?;
        Ok(())
    }

    fn add_all(&mut self, paths: &[PathBuf]) -> HistoryWriterResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "-A", "--"];
        let strs: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        args.extend(strs.iter().map(String::as_str));
        self.run(&args)?;
        Ok(())
    }

    fn remove(&mut self, path: &Path, recursive: bool) -> HistoryWriterResult<()> {
        let display = path.display().to_string();
        let mut args = vec!["rm", "-f", "--ignore-unmatch"];
        if recursive {
            args.push("-r");
        }
        args.push("--");
        args.push(&display);
        self.run(&args)?;
        Ok(())
    }

    fn rename(&mut self, src: &Path, dst: &Path) -> HistoryWriterResult<()> {
        // The filesystem-level move already happened (ReplayEngine owns
        // that side-effect per spec §8); staging both paths lets git's own
        // diff machinery detect the rename.
        self.add_all(&[src.to_path_buf(), dst.to_path_buf()])
    }

    #[instrument(skip(self, comment))]
    fn commit(
        &mut self,
        name: &str,
        email: &str,
        comment: &str,
        timestamp: Timestamp,
    ) -> HistoryWriterResult<bool> {
        if !self.has_staged_changes()? {
            return Ok(false);
        }
        let date = format!("@{} +0000", timestamp.epoch_secs());
        self.run_with_env(
            &["commit", "--quiet", "--no-verify", "--allow-empty-message", "-m", comment],
            &[
                ("GIT_AUTHOR_NAME", name),
                ("GIT_AUTHOR_EMAIL", email),
                ("GIT_AUTHOR_DATE", &date),
                ("GIT_COMMITTER_NAME", name),
                ("GIT_COMMITTER_EMAIL", email),
                ("GIT_COMMITTER_DATE", &date),
            ],
        )?;
        self.commit_count += 1;
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
        let date = format!("@{} +0000", timestamp.epoch_secs());
        self.run_with_env(
            &["tag", "-a", name, "-m", message],
            &[
                ("GIT_COMMITTER_NAME", tagger_name),
                ("GIT_COMMITTER_EMAIL", tagger_email),
                ("GIT_COMMITTER_DATE", &date),
            ],
        )?;
        Ok(())
    }

    fn checkpoint(&mut self) -> HistoryWriterResult<()> {
        self.run(&["gc", "--auto", "--quiet"])?;
        Ok(())
    }

    fn dispose(&mut self) -> HistoryWriterResult<()> {
        Ok(())
    }
}
