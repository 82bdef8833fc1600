//! `ChangesetBuilder` (spec §4.2, component C): fuses the sorted revision
//! stream from [`crate::analyzer`] into atomic changesets by (user, comment,
//! time-window, conflict) rules.
//!
//! Grounded on the teacher's `op_heads_store.rs`-style fold-over-a-sorted-
//! sequence shape (accumulate into an open accumulator, close it when the
//! next element breaks an invariant); there is no async or backend
//! involvement here so this stays a pure, synchronous transform.

use crate::action::Action;
use crate::ids::UserName;
use crate::revision::Revision;
use crate::revision::Timestamp;

/// An atomic group of legacy revisions that replay as one commit.
#[derive(Debug, Clone)]
pub struct Changeset {
    pub revisions: Vec<Revision>,
    pub user: UserName,
    /// Longest non-empty comment among the changeset's revisions; empty if
    /// every revision's comment is empty (spec §4.2 "Closure").
    pub comment: String,
    /// Earliest revision timestamp in the changeset.
    ///
    /// Open question: spec §3 describes the changeset's "aggregate
    /// timestamp" as the *last* revision's time, while §4.2's "Closure"
    /// rule says a closed changeset "inherits the earliest timestamp as its
    /// commit time". Those two sentences disagree; this implementation
    /// follows §4.2 (the operational rule that actually produces the
    /// commit timestamp used by `ReplayEngine`'s date-range windowing).
    /// Recorded in DESIGN.md.
    pub commit_timestamp: Timestamp,
}

pub struct ChangesetBuilder {
    any_comment_window_secs: i64,
    same_comment_window_secs: i64,
}

impl ChangesetBuilder {
    pub fn new(any_comment_window_secs: i64, same_comment_window_secs: i64) -> Self {
        assert!(
            same_comment_window_secs >= any_comment_window_secs,
            "sameCommentWindow must be >= anyCommentWindow"
        );
        Self { any_comment_window_secs, same_comment_window_secs }
    }

    pub fn with_default_windows() -> Self {
        Self::new(30, 600)
    }

    /// Scans `revisions` (already sorted by timestamp, discovery order
    /// preserved on ties) and clusters them per spec §4.2.
    pub fn build(&self, revisions: &[Revision]) -> Vec<Changeset> {
        let mut changesets = Vec::new();
        let mut open: Option<OpenChangeset> = None;

        for rev in revisions {
            let accepted = match &open {
                Some(current) => self.accepts(current, rev),
                None => false,
            };
            if accepted {
                open.as_mut().unwrap().push(rev.clone());
            } else {
                if let Some(current) = open.take() {
                    changesets.push(current.close());
                }
                open = Some(OpenChangeset::start(rev.clone()));
            }
        }
        if let Some(current) = open {
            changesets.push(current.close());
        }
        changesets
    }

    fn accepts(&self, current: &OpenChangeset, next: &Revision) -> bool {
        if current.user != next.user {
            return false;
        }
        let gap = next.timestamp.diff_secs(&current.last_timestamp).abs();

        let within_any_window = gap <= self.any_comment_window_secs;
        let comments_match_within_same_window = gap <= self.same_comment_window_secs
            && normalize_comment(next.comment.as_deref().unwrap_or(""))
                == normalize_comment(current.last_comment.as_deref().unwrap_or(""));

        if !(within_any_window || comments_match_within_same_window) {
            return false;
        }

        !current.revisions.iter().any(|r| conflicts(r, next))
    }
}

struct OpenChangeset {
    user: UserName,
    last_timestamp: Timestamp,
    last_comment: Option<String>,
    revisions: Vec<Revision>,
}

impl OpenChangeset {
    fn start(rev: Revision) -> Self {
        Self {
            user: rev.user.clone(),
            last_timestamp: rev.timestamp,
            last_comment: rev.comment.clone(),
            revisions: vec![rev],
        }
    }

    fn push(&mut self, rev: Revision) {
        self.last_timestamp = rev.timestamp;
        self.last_comment = rev.comment.clone();
        self.revisions.push(rev);
    }

    fn close(self) -> Changeset {
        let commit_timestamp = self
            .revisions
            .iter()
            .map(|r| r.timestamp)
            .min()
            .unwrap_or(self.last_timestamp);
        let comment = self
            .revisions
            .iter()
            .filter_map(|r| r.comment.as_deref())
            .filter(|c| !c.is_empty())
            .max_by_key(|c| c.len())
            .unwrap_or("")
            .to_string();
        Changeset { revisions: self.revisions, user: self.user, comment, commit_timestamp }
    }
}

/// Per spec §4.2 "Conflict rule": two revisions on the same *file* physical
/// id, both edits, conflict (a single atomic commit cannot represent two
/// distinct content states of one file). Project-level actions that happen
/// to target the same file from different acting projects (Add/Share/
/// Delete/Destroy) never conflict here, because their `Revision::item` is
/// the *acting project*, not the file — only `Edit` carries the file as
/// `item`.
fn conflicts(a: &Revision, b: &Revision) -> bool {
    matches!((&a.action, &b.action), (Action::Edit { .. }, Action::Edit { .. })) && a.item == b.item
}

/// Trims trailing whitespace per line, collapses line endings to LF, and
/// drops leading/trailing blank lines (spec §4.2 clustering rule item 2).
fn normalize_comment(raw: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().map(str::trim_end).collect();
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PhysicalId;

    fn rev(item: &str, t: i64, user: &str, comment: Option<&str>, action: Action) -> Revision {
        Revision {
            item: PhysicalId::new(item),
            timestamp: Timestamp::from_epoch_secs(t),
            user: UserName::new(user),
            comment: comment.map(str::to_string),
            version: 1,
            action,
        }
    }

    #[test]
    fn same_user_within_any_window_merges() {
        let revisions = vec![
            rev("p", 0, "alice", None, Action::Add { target: PhysicalId::new("f1") }),
            rev("p", 10, "alice", None, Action::Add { target: PhysicalId::new("f2") }),
        ];
        let changesets = ChangesetBuilder::with_default_windows().build(&revisions);
        assert_eq!(changesets.len(), 1);
        assert_eq!(changesets[0].revisions.len(), 2);
    }

    #[test]
    fn different_user_starts_new_changeset() {
        let revisions = vec![
            rev("p", 0, "alice", None, Action::Add { target: PhysicalId::new("f1") }),
            rev("p", 1, "bob", None, Action::Add { target: PhysicalId::new("f2") }),
        ];
        let changesets = ChangesetBuilder::with_default_windows().build(&revisions);
        assert_eq!(changesets.len(), 2);
    }

    #[test]
    fn matching_comment_extends_merge_past_any_window() {
        let revisions = vec![
            rev("p", 0, "alice", Some("fix bug"), Action::Add { target: PhysicalId::new("f1") }),
            rev("p", 120, "alice", Some("fix bug"), Action::Add { target: PhysicalId::new("f2") }),
        ];
        let changesets = ChangesetBuilder::with_default_windows().build(&revisions);
        assert_eq!(changesets.len(), 1);
    }

    #[test]
    fn differing_comment_past_any_window_splits() {
        let revisions = vec![
            rev("p", 0, "alice", Some("fix bug"), Action::Add { target: PhysicalId::new("f1") }),
            rev("p", 120, "alice", Some("add feature"), Action::Add { target: PhysicalId::new("f2") }),
        ];
        let changesets = ChangesetBuilder::with_default_windows().build(&revisions);
        assert_eq!(changesets.len(), 2);
    }

    #[test]
    fn two_edits_on_same_file_conflict_and_split() {
        let revisions = vec![
            rev("f1", 0, "alice", None, Action::Edit { target: PhysicalId::new("f1") }),
            rev("f1", 1, "alice", None, Action::Edit { target: PhysicalId::new("f1") }),
        ];
        let changesets = ChangesetBuilder::with_default_windows().build(&revisions);
        assert_eq!(changesets.len(), 2);
    }

    #[test]
    fn shared_file_touched_from_different_projects_does_not_conflict() {
        let revisions = vec![
            rev("projA", 0, "alice", None, Action::Add { target: PhysicalId::new("shared") }),
            rev("projB", 1, "alice", None, Action::Share { target: PhysicalId::new("shared") }),
        ];
        let changesets = ChangesetBuilder::with_default_windows().build(&revisions);
        assert_eq!(changesets.len(), 1);
    }

    #[test]
    fn closure_picks_earliest_timestamp_and_longest_comment() {
        let revisions = vec![
            rev("p", 5, "alice", Some("short"), Action::Add { target: PhysicalId::new("f1") }),
            rev("p", 6, "alice", Some("a much longer comment"), Action::Add { target: PhysicalId::new("f2") }),
        ];
        let changesets = ChangesetBuilder::with_default_windows().build(&revisions);
        assert_eq!(changesets.len(), 1);
        assert_eq!(changesets[0].commit_timestamp, Timestamp::from_epoch_secs(5));
        assert_eq!(changesets[0].comment, "a much longer comment");
    }

    #[test]
    fn normalize_comment_drops_blank_lines_and_crlf() {
        assert_eq!(normalize_comment("\r\n  hello  \r\nworld\r\n\r\n"), "hello\nworld");
    }
}
