//! Items, revisions, and timestamps (spec §3).

use std::cmp::Ordering;

use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Local;
use chrono::TimeZone as _;

use crate::action::Action;
use crate::ids::PhysicalId;
use crate::ids::UserName;

/// Second-precision local wall-clock timestamp.
///
/// Kept as a dedicated type (rather than bare `chrono::DateTime`) the same
/// way the teacher wraps `MillisSinceEpoch`/`Timestamp` around a raw epoch
/// value in `backend.rs`: the legacy format only has second precision, so
/// rounding is made explicit here instead of silently happening wherever a
/// comparison is made.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Timestamp {
    secs_since_epoch: i64,
}

impl Timestamp {
    pub fn from_epoch_secs(secs_since_epoch: i64) -> Self {
        Self { secs_since_epoch }
    }

    pub fn epoch_secs(&self) -> i64 {
        self.secs_since_epoch
    }

    pub fn now() -> Self {
        Self::from_epoch_secs(chrono::Utc::now().timestamp())
    }

    /// Difference in whole seconds, `self - other`. May be negative.
    pub fn diff_secs(&self, other: &Self) -> i64 {
        self.secs_since_epoch - other.secs_since_epoch
    }

    pub fn to_local_datetime(&self) -> DateTime<Local> {
        Local
            .timestamp_opt(self.secs_since_epoch, 0)
            .single()
            .unwrap_or_else(|| Local.timestamp_opt(0, 0).single().unwrap())
    }

    pub fn to_fixed_offset(&self, tz_offset_minutes: i32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(tz_offset_minutes * 60).unwrap_or_else(|| {
            FixedOffset::east_opt(0).expect("zero offset is always valid")
        });
        offset
            .timestamp_opt(self.secs_since_epoch, 0)
            .single()
            .unwrap_or_else(|| offset.timestamp_opt(0, 0).single().unwrap())
    }
}

/// Whether an item is a container of other items or a versioned leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Project,
    File,
}

/// A uniquely named record in the legacy database (spec §3).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Item {
    pub id: PhysicalId,
    pub kind: ItemKind,
    pub logical_name: String,
}

/// An immutable event on an item, as decoded by [`crate::legacy_db::LegacyDatabase`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Revision {
    /// The item whose revision log this entry belongs to. For project-level
    /// actions this is the acting project; for file-level actions
    /// (`Edit`) this is the file itself.
    pub item: PhysicalId,
    pub timestamp: Timestamp,
    pub user: UserName,
    pub comment: Option<String>,
    /// Monotonically increasing per item, starting at 1.
    pub version: u32,
    pub action: Action,
}

impl Revision {
    /// Sort key used to materialize [`crate::analyzer::SortedRevisions`]:
    /// timestamp first, ties broken by discovery order (stable sort, so
    /// equal timestamps preserve the order revisions were appended in).
    pub fn timestamp_key(&self) -> Timestamp {
        self.timestamp
    }
}

/// Total order used only for deterministic fixture construction in tests;
/// production code relies on stable sorts over [`Revision::timestamp_key`].
pub fn compare_by_time(a: &Revision, b: &Revision) -> Ordering {
    a.timestamp.cmp(&b.timestamp)
}
