//! The retry/ignore/abort state machine surrounding every `HistoryWriter`
//! call (spec §4.6, grounding §4.4's and §7's failure semantics).
//!
//! Grounded on the general shape of the teacher's own retry loops around
//! fallible I/O (e.g. `git_subprocess.rs`'s per-call error classification);
//! generalized here into a reusable policy object instead of being inlined
//! at each call site, since `ReplayEngine` needs the exact same decision at
//! every one of its `HistoryWriter` calls.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::history_writer::HistoryWriterError;
use crate::history_writer::HistoryWriterResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorOutcome {
    Retry,
    Ignore,
    Abort,
}

/// Decides how to handle a single failed `HistoryWriter` call.
///
/// In unattended/CLI use, `ignoreErrors=true` pins every *non-transient*
/// outcome to [`ErrorOutcome::Ignore`] (spec §4.4). Transient I/O errors
/// (e.g. a `native-process` subprocess call) are retried up to a bound
/// first, regardless of `ignoreErrors`, before falling back to that
/// ignore/abort decision.
pub struct ErrorPolicy {
    ignore_errors: bool,
    max_retries: u32,
    retry_backoff: Duration,
}

impl ErrorPolicy {
    pub fn new(ignore_errors: bool) -> Self {
        Self { ignore_errors, max_retries: 2, retry_backoff: Duration::from_millis(50) }
    }

    pub fn unattended() -> Self {
        Self::new(true)
    }

    /// `HistoryWriterError::Io` is the transient-I/O class (spec.md:163,
    /// SPEC_FULL.md:201): a subprocess backend's pipe/spawn failure that is
    /// often gone on the next attempt. Every other variant (`Init`,
    /// `Unsupported`, `Failed`) represents a call that is already known not
    /// to succeed again unchanged, so it skips straight to ignore/abort.
    fn classify(&self, error: &HistoryWriterError, attempt: u32) -> ErrorOutcome {
        if matches!(error, HistoryWriterError::Io(_)) && attempt < self.max_retries {
            return ErrorOutcome::Retry;
        }
        if self.ignore_errors { ErrorOutcome::Ignore } else { ErrorOutcome::Abort }
    }

    /// Runs `op`, retrying per policy, until it succeeds, is ignored (in
    /// which case `Ok(None)` is returned so the caller can skip the write),
    /// or aborts (propagating the last error).
    pub fn run<T>(&self, mut op: impl FnMut() -> HistoryWriterResult<T>) -> HistoryWriterResult<Option<T>> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(Some(value)),
                Err(error) => match self.classify(&error, attempt) {
                    ErrorOutcome::Retry => {
                        attempt += 1;
                        warn!(attempt, %error, "retrying after transient writer I/O error");
                        thread::sleep(self.retry_backoff);
                    }
                    ErrorOutcome::Abort => return Err(error),
                    ErrorOutcome::Ignore => {
                        warn!(%error, "ignoring writer error, continuing replay");
                        return Ok(None);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn io_error() -> HistoryWriterError {
        HistoryWriterError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }

    #[test]
    fn unattended_policy_ignores_non_transient_failures() {
        let policy = ErrorPolicy::unattended();
        let mut calls = 0;
        let result = policy.run(|| {
            calls += 1;
            Err(HistoryWriterError::Failed("bad ref".to_string()))
        });
        assert!(matches!(result, Ok(None)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn attended_policy_propagates_non_transient_failure() {
        let policy = ErrorPolicy::new(false);
        let result = policy.run(|| Err::<(), _>(HistoryWriterError::Failed("bad ref".to_string())));
        assert!(result.is_err());
    }

    #[test]
    fn success_short_circuits() {
        let policy = ErrorPolicy::unattended();
        let result = policy.run(|| Ok(42));
        assert!(matches!(result, Ok(Some(42))));
    }

    #[test]
    fn transient_io_error_is_retried_then_succeeds() {
        let policy = ErrorPolicy::new(false);
        let mut calls = 0;
        let result = policy.run(|| {
            calls += 1;
            if calls < 3 { Err(io_error()) } else { Ok(calls) }
        });
        assert!(matches!(result, Ok(Some(3))));
        assert_eq!(calls, 3);
    }

    #[test]
    fn transient_io_error_aborts_after_retries_exhausted_when_attended() {
        let policy = ErrorPolicy::new(false);
        let mut calls = 0;
        let result = policy.run(|| {
            calls += 1;
            Err::<(), _>(io_error())
        });
        assert!(result.is_err());
        // initial attempt + max_retries(2) retries = 3 calls total.
        assert_eq!(calls, 3);
    }

    #[test]
    fn transient_io_error_is_ignored_after_retries_exhausted_when_unattended() {
        let policy = ErrorPolicy::unattended();
        let mut calls = 0;
        let result = policy.run(|| {
            calls += 1;
            Err::<(), _>(io_error())
        });
        assert!(matches!(result, Ok(None)));
        assert_eq!(calls, 3);
    }
}
