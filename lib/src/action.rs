//! The closed set of legacy revision actions (spec §3).
//!
//! Modeled the way the teacher models its own tagged union of stored values
//! (`backend::TreeValue`): an exhaustive enum matched directly, no trait
//! objects or virtual dispatch. The ordering used to serialize a changeset
//! (spec §4.4) is a plain lookup table over these variants, kept in
//! [`crate::replay::action_priority`] rather than encoded here, so this type
//! stays a pure data description of "what happened".

use crate::ids::PhysicalId;

/// One event recorded against an item in the legacy database.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    /// Item creation. Ignored: materialization happens via [`Action::Add`].
    Create,
    /// A project adds a new child item.
    Add { target: PhysicalId },
    /// A project acquires an additional reference to an existing file.
    Share { target: PhysicalId },
    /// A project replaces a shared reference with a private copy; `source`
    /// continues independently of the new `target`.
    Branch {
        source: PhysicalId,
        target: PhysicalId,
    },
    /// A project freezes a shared file at a specific version.
    Pin { target: PhysicalId, version: u32 },
    /// A project unfreezes a previously pinned file.
    Unpin { target: PhysicalId },
    /// Logical-name change; no physical change.
    Rename { old: String, new: String },
    /// A project reparenting, authoritative half: the source project's
    /// revision.
    MoveFrom {
        source_parent: PhysicalId,
        target: PhysicalId,
    },
    /// A project reparenting, bookkeeping half: the destination project's
    /// revision.
    MoveTo {
        new_parent: PhysicalId,
        target: PhysicalId,
    },
    /// Soft-remove from a parent's child list.
    Delete { target: PhysicalId },
    /// Undo a soft-remove.
    Recover { target: PhysicalId },
    /// Hard-remove; the item is retained in the map but flagged destroyed.
    Destroy { target: PhysicalId },
    /// Opaque export. Ignored.
    Archive { target: PhysicalId, path: String },
    /// Opaque import; behaves like [`Action::Add`].
    Restore { target: PhysicalId, path: String },
    /// Symbolic tag on a project at a point in time.
    Label { text: String },
    /// File content change. A file-level action, never emitted against a
    /// project.
    Edit { target: PhysicalId },
}

impl Action {
    /// The physical id this action primarily acts on, if any. `Branch` and
    /// the `Move*` pair have two relevant ids; this returns the one that
    /// identifies "the item being acted upon" for conflict-rule purposes
    /// (spec §4.2).
    pub fn primary_target(&self) -> Option<&PhysicalId> {
        match self {
            Self::Create | Self::Label { .. } => None,
            Self::Add { target }
            | Self::Share { target }
            | Self::Branch { target, .. }
            | Self::Pin { target, .. }
            | Self::Unpin { target }
            | Self::MoveFrom { target, .. }
            | Self::MoveTo { target, .. }
            | Self::Delete { target }
            | Self::Recover { target }
            | Self::Destroy { target }
            | Self::Archive { target, .. }
            | Self::Restore { target, .. }
            | Self::Edit { target } => Some(target),
            Self::Rename { .. } => None,
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self, Self::Edit { .. })
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Self::Label { .. })
    }
}
