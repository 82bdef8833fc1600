//! `PathMapper` (spec §4.3, component D): the virtual filesystem that tracks
//! where every item currently lives, which projects share a file, and which
//! files are pinned.
//!
//! Grounded on spec §9's explicit guidance ("cyclic references in PathMapper
//! — represent with arena + integer indices... never reference-count with
//! back-pointers that would create cycles") and on the general arena-of-
//! nodes-plus-id-index shape the teacher uses for its own object maps
//! (`index/`'s commit/change index tables: a dense arena, looked up through
//! a side `HashMap` from stable id to arena slot).

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::ids::PhysicalId;
use crate::path::LogicalPath;
use crate::revision::ItemKind;

#[derive(Debug, Error)]
pub enum PathMapperError {
    #[error("{action} references unknown item {id}")]
    UnknownItem { action: &'static str, id: PhysicalId },
    #[error("{action} references unknown parent project {id}")]
    UnknownParent { action: &'static str, id: PhysicalId },
    #[error("item {id} is not a project")]
    NotAProject { id: PhysicalId },
    #[error("item {id} is not a file")]
    NotAFile { id: PhysicalId },
}

pub type PathMapperResult<T> = Result<T, PathMapperError>;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct Handle(usize);

enum Node {
    Project(ProjectNode),
    File(FileNode),
}

struct ProjectNode {
    id: PhysicalId,
    logical_name: String,
    parent: Option<Handle>,
    children: Vec<Handle>,
    destroyed: bool,
}

struct FileNode {
    id: PhysicalId,
    logical_name: String,
    /// Parent projects currently holding this file (spec §3 "sharing set").
    sharing_set: Vec<Handle>,
    current_version: u32,
    /// Per-parent pin: a sharing project may freeze the file at a version
    /// while other sharing projects follow head (spec §4.3 "Pin").
    pins: HashMap<Handle, u32>,
    destroyed: bool,
}

impl Node {
    fn id(&self) -> &PhysicalId {
        match self {
            Node::Project(p) => &p.id,
            Node::File(f) => &f.id,
        }
    }

    fn logical_name(&self) -> &str {
        match self {
            Node::Project(p) => &p.logical_name,
            Node::File(f) => &f.logical_name,
        }
    }

    fn destroyed(&self) -> bool {
        match self {
            Node::Project(p) => p.destroyed,
            Node::File(f) => f.destroyed,
        }
    }

    fn set_destroyed(&mut self, value: bool) {
        match self {
            Node::Project(p) => p.destroyed = value,
            Node::File(f) => f.destroyed = value,
        }
    }

    fn set_logical_name(&mut self, name: impl Into<String>) {
        match self {
            Node::Project(p) => p.logical_name = name.into(),
            Node::File(f) => f.logical_name = name.into(),
        }
    }
}

#[derive(Default)]
pub struct PathMapper {
    arena: Vec<Node>,
    by_id: HashMap<PhysicalId, Handle>,
    roots: HashMap<Handle, LogicalPath>,
}

impl PathMapper {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle_of(&self, id: &PhysicalId) -> Option<Handle> {
        self.by_id.get(id).copied()
    }

    fn node(&self, h: Handle) -> &Node {
        &self.arena[h.0]
    }

    fn node_mut(&mut self, h: Handle) -> &mut Node {
        &mut self.arena[h.0]
    }

    fn ensure_node(&mut self, id: &PhysicalId, kind: ItemKind, logical_name: &str) -> Handle {
        if let Some(h) = self.by_id.get(id) {
            return *h;
        }
        let node = match kind {
            ItemKind::Project => Node::Project(ProjectNode {
                id: id.clone(),
                logical_name: logical_name.to_string(),
                parent: None,
                children: Vec::new(),
                destroyed: false,
            }),
            ItemKind::File => Node::File(FileNode {
                id: id.clone(),
                logical_name: logical_name.to_string(),
                sharing_set: Vec::new(),
                // A file always has content by the time it is first linked
                // in (via Add/Share/Recover/Restore), so it starts at
                // version 1 rather than the arena-default 0.
                current_version: 1,
                pins: HashMap::new(),
                destroyed: false,
            }),
        };
        let handle = Handle(self.arena.len());
        self.arena.push(node);
        self.by_id.insert(id.clone(), handle);
        handle
    }

    fn project_children_mut(&mut self, h: Handle) -> PathMapperResult<&mut Vec<Handle>> {
        match self.node_mut(h) {
            Node::Project(p) => Ok(&mut p.children),
            Node::File(f) => Err(PathMapperError::NotAProject { id: f.id.clone() }),
        }
    }

    /// Registers a root mapping: ancestor lookups through this project
    /// resolve against `working_path` (spec §4.3 `SetRoot`).
    pub fn set_root(&mut self, id: &PhysicalId, logical_name: &str, working_path: LogicalPath) {
        let handle = self.ensure_node(id, ItemKind::Project, logical_name);
        self.roots.insert(handle, working_path);
    }

    /// Creates `child` if absent and links it into `parent`'s child list
    /// (spec §4.3 `AddItem`). A duplicate logical name under one parent is
    /// not rejected here — it is still added, and the caller is expected to
    /// log a warning (per spec: "dup-name: new item still added, replay
    /// later logs a warning").
    pub fn add_item(
        &mut self,
        parent: &PhysicalId,
        child: &PhysicalId,
        kind: ItemKind,
        logical_name: &str,
    ) -> PathMapperResult<()> {
        let parent_handle = self
            .handle_of(parent)
            .ok_or_else(|| PathMapperError::UnknownParent { action: "AddItem", id: parent.clone() })?;
        if self.has_duplicate_name(parent_handle, logical_name, None) {
            warn!(parent = %parent, name = %logical_name, "duplicate logical name under parent");
        }
        let child_handle = self.ensure_node(child, kind, logical_name);
        self.link_child(parent_handle, child_handle)?;
        if let Node::Project(p) = self.node_mut(child_handle) {
            p.parent = Some(parent_handle);
        }
        if let Node::File(f) = self.node_mut(child_handle)
            && !f.sharing_set.contains(&parent_handle)
        {
            f.sharing_set.push(parent_handle);
        }
        Ok(())
    }

    fn has_duplicate_name(&self, parent: Handle, name: &str, excluding: Option<Handle>) -> bool {
        let Node::Project(p) = self.node(parent) else { return false };
        p.children.iter().any(|&h| {
            Some(h) != excluding && self.node(h).logical_name().eq_ignore_ascii_case(name)
        })
    }

    fn link_child(&mut self, parent: Handle, child: Handle) -> PathMapperResult<()> {
        let children = self.project_children_mut(parent)?;
        if !children.contains(&child) {
            children.push(child);
        }
        Ok(())
    }

    /// Adds `parent` to an existing file's sharing set (spec §4.3 `Share`).
    pub fn share(&mut self, parent: &PhysicalId, file: &PhysicalId) -> PathMapperResult<()> {
        let parent_handle = self
            .handle_of(parent)
            .ok_or_else(|| PathMapperError::UnknownParent { action: "Share", id: parent.clone() })?;
        let file_handle = self
            .handle_of(file)
            .ok_or_else(|| PathMapperError::UnknownItem { action: "Share", id: file.clone() })?;
        match self.node_mut(file_handle) {
            Node::File(f) => {
                if !f.sharing_set.contains(&parent_handle) {
                    f.sharing_set.push(parent_handle);
                }
            }
            Node::Project(p) => return Err(PathMapperError::NotAFile { id: p.id.clone() }),
        }
        self.link_child(parent_handle, file_handle)
    }

    /// Converts a share into an independent copy (spec §4.3 `BranchFile`):
    /// removes `parent` from `old_file`'s sharing set and creates `new_file`
    /// with its own node, inheriting the current version.
    pub fn branch_file(
        &mut self,
        parent: &PhysicalId,
        old_file: &PhysicalId,
        new_file: &PhysicalId,
        new_logical_name: &str,
    ) -> PathMapperResult<()> {
        let parent_handle = self
            .handle_of(parent)
            .ok_or_else(|| PathMapperError::UnknownParent { action: "Branch", id: parent.clone() })?;
        let old_handle = self
            .handle_of(old_file)
            .ok_or_else(|| PathMapperError::UnknownItem { action: "Branch", id: old_file.clone() })?;
        let inherited_version = match self.node_mut(old_handle) {
            Node::File(f) => {
                f.sharing_set.retain(|&h| h != parent_handle);
                f.current_version
            }
            Node::Project(p) => return Err(PathMapperError::NotAFile { id: p.id.clone() }),
        };
        if let Ok(children) = self.project_children_mut(parent_handle) {
            children.retain(|&h| h != old_handle);
        }
        let new_handle = self.ensure_node(new_file, ItemKind::File, new_logical_name);
        if let Node::File(f) = self.node_mut(new_handle) {
            f.current_version = inherited_version;
            if !f.sharing_set.contains(&parent_handle) {
                f.sharing_set.push(parent_handle);
            }
        }
        self.link_child(parent_handle, new_handle)
    }

    pub fn pin(&mut self, parent: &PhysicalId, file: &PhysicalId, version: u32) -> PathMapperResult<()> {
        let parent_handle = self
            .handle_of(parent)
            .ok_or_else(|| PathMapperError::UnknownParent { action: "Pin", id: parent.clone() })?;
        let file_handle = self
            .handle_of(file)
            .ok_or_else(|| PathMapperError::UnknownItem { action: "Pin", id: file.clone() })?;
        match self.node_mut(file_handle) {
            Node::File(f) => {
                f.pins.insert(parent_handle, version);
                Ok(())
            }
            Node::Project(p) => Err(PathMapperError::NotAFile { id: p.id.clone() }),
        }
    }

    pub fn unpin(&mut self, parent: &PhysicalId, file: &PhysicalId) -> PathMapperResult<()> {
        let parent_handle = self
            .handle_of(parent)
            .ok_or_else(|| PathMapperError::UnknownParent { action: "Unpin", id: parent.clone() })?;
        let file_handle = self
            .handle_of(file)
            .ok_or_else(|| PathMapperError::UnknownItem { action: "Unpin", id: file.clone() })?;
        match self.node_mut(file_handle) {
            Node::File(f) => {
                f.pins.remove(&parent_handle);
                Ok(())
            }
            Node::Project(p) => Err(PathMapperError::NotAFile { id: p.id.clone() }),
        }
    }

    /// Updates an item's display name; parent linkage is unchanged (spec
    /// §4.3 `Rename`).
    pub fn rename(&mut self, item: &PhysicalId, new_logical_name: &str) -> PathMapperResult<()> {
        let handle = self
            .handle_of(item)
            .ok_or_else(|| PathMapperError::UnknownItem { action: "Rename", id: item.clone() })?;
        self.node_mut(handle).set_logical_name(new_logical_name);
        Ok(())
    }

    /// Relocates a project subtree. Both `MoveFrom` and `MoveTo` route
    /// through this: whichever is applied first performs the reparent,
    /// the second is a no-op since the project's parent already matches
    /// (spec §4.3: "the first applied wins and the second is idempotent").
    pub fn reparent(&mut self, project: &PhysicalId, new_parent: &PhysicalId) -> PathMapperResult<()> {
        let handle = self
            .handle_of(project)
            .ok_or_else(|| PathMapperError::UnknownItem { action: "Move", id: project.clone() })?;
        let new_parent_handle = self
            .handle_of(new_parent)
            .ok_or_else(|| PathMapperError::UnknownParent { action: "Move", id: new_parent.clone() })?;

        let current_parent = match self.node(handle) {
            Node::Project(p) => p.parent,
            Node::File(f) => return Err(PathMapperError::NotAProject { id: f.id.clone() }),
        };
        if current_parent == Some(new_parent_handle) {
            return Ok(());
        }
        if let Some(old) = current_parent
            && let Node::Project(op) = self.node_mut(old)
        {
            op.children.retain(|&h| h != handle);
        }
        self.link_child(new_parent_handle, handle)?;
        if let Node::Project(p) = self.node_mut(handle) {
            p.parent = Some(new_parent_handle);
        }
        Ok(())
    }

    /// Soft-removes `item` from `parent`'s child list (spec §4.3 `Delete`).
    pub fn delete(&mut self, parent: &PhysicalId, item: &PhysicalId) -> PathMapperResult<()> {
        let parent_handle = self
            .handle_of(parent)
            .ok_or_else(|| PathMapperError::UnknownParent { action: "Delete", id: parent.clone() })?;
        let item_handle = self
            .handle_of(item)
            .ok_or_else(|| PathMapperError::UnknownItem { action: "Delete", id: item.clone() })?;
        if let Ok(children) = self.project_children_mut(parent_handle) {
            children.retain(|&h| h != item_handle);
        }
        if let Node::File(f) = self.node_mut(item_handle) {
            f.sharing_set.retain(|&h| h != parent_handle);
        }
        Ok(())
    }

    /// Undoes a soft-remove, relinking `item` under `parent` (spec §4.3
    /// `Recover`). Clears the destroyed flag in case the item was
    /// previously hard-destroyed and is being reintroduced.
    pub fn recover(
        &mut self,
        parent: &PhysicalId,
        item: &PhysicalId,
        kind: ItemKind,
        logical_name: &str,
    ) -> PathMapperResult<()> {
        let parent_handle = self
            .handle_of(parent)
            .ok_or_else(|| PathMapperError::UnknownParent { action: "Recover", id: parent.clone() })?;
        let item_handle = self.ensure_node(item, kind, logical_name);
        self.node_mut(item_handle).set_destroyed(false);
        self.link_child(parent_handle, item_handle)?;
        match self.node_mut(item_handle) {
            Node::Project(p) => p.parent = Some(parent_handle),
            Node::File(f) => {
                if !f.sharing_set.contains(&parent_handle) {
                    f.sharing_set.push(parent_handle);
                }
            }
        }
        Ok(())
    }

    /// Hard-flags `item` destroyed; it remains in the arena (spec §4.3
    /// `Destroy`, §3 "retained in the map but flagged destroyed").
    pub fn destroy(&mut self, item: &PhysicalId) -> PathMapperResult<()> {
        let handle = self
            .handle_of(item)
            .ok_or_else(|| PathMapperError::UnknownItem { action: "Destroy", id: item.clone() })?;
        self.node_mut(handle).set_destroyed(true);
        Ok(())
    }

    pub fn item_kind(&self, id: &PhysicalId) -> Option<ItemKind> {
        self.handle_of(id).map(|h| match self.node(h) {
            Node::Project(_) => ItemKind::Project,
            Node::File(_) => ItemKind::File,
        })
    }

    pub fn is_destroyed(&self, id: &PhysicalId) -> bool {
        self.handle_of(id).is_some_and(|h| self.node(h).destroyed())
    }

    pub fn logical_name(&self, id: &PhysicalId) -> Option<&str> {
        self.handle_of(id).map(|h| self.node(h).logical_name())
    }

    pub fn children_of(&self, id: &PhysicalId) -> Vec<PhysicalId> {
        match self.handle_of(id).map(|h| self.node(h)) {
            Some(Node::Project(p)) => p.children.iter().map(|&h| self.node(h).id().clone()).collect(),
            _ => Vec::new(),
        }
    }

    fn project_working_path(&self, mut current: Handle) -> Option<LogicalPath> {
        let mut names = Vec::new();
        loop {
            if let Some(root_path) = self.roots.get(&current) {
                let mut path = root_path.clone();
                for name in names.iter().rev() {
                    path = path.join(name);
                }
                return Some(path);
            }
            match self.node(current) {
                Node::Project(p) => {
                    names.push(p.logical_name.clone());
                    match p.parent {
                        Some(parent) => current = parent,
                        None => return None,
                    }
                }
                Node::File(_) => return None,
            }
        }
    }

    /// Returns the current working path for a project, or the first rooted
    /// sharing path for a file. Files that are shared into several rooted
    /// projects have more than one working path; use
    /// [`PathMapper::file_paths`] to get all of them.
    pub fn working_path(&self, id: &PhysicalId) -> Option<LogicalPath> {
        let handle = self.handle_of(id)?;
        match self.node(handle) {
            Node::Project(_) => self.project_working_path(handle),
            Node::File(f) => f
                .sharing_set
                .iter()
                .find_map(|&parent| self.project_working_path(parent))
                .map(|p| p.join(f.logical_name.clone())),
        }
    }

    /// All rooted working paths a file is currently materialized at (spec
    /// §4.3 `GetFilePaths`), optionally restricted to one sharing project.
    pub fn file_paths(&self, file: &PhysicalId, under_project: Option<&PhysicalId>) -> Vec<LogicalPath> {
        let Some(handle) = self.handle_of(file) else { return Vec::new() };
        let Node::File(f) = self.node(handle) else { return Vec::new() };
        let under_handle = under_project.and_then(|p| self.handle_of(p));
        f.sharing_set
            .iter()
            .filter(|&&parent| under_handle.is_none_or(|u| u == parent))
            .filter_map(|&parent| self.project_working_path(parent))
            .map(|p| p.join(f.logical_name.clone()))
            .collect()
    }

    pub fn is_project_rooted(&self, id: &PhysicalId) -> bool {
        self.handle_of(id).is_some_and(|h| self.project_working_path(h).is_some())
    }

    /// Effective version of a file: the pin set for `under_project`, if
    /// any, otherwise the current version (spec §4.3 "Pin overrides on
    /// read in sharing projects where the pin applies").
    pub fn file_version(&self, file: &PhysicalId, under_project: Option<&PhysicalId>) -> Option<u32> {
        let handle = self.handle_of(file)?;
        let Node::File(f) = self.node(handle) else { return None };
        if let Some(parent) = under_project.and_then(|p| self.handle_of(p))
            && let Some(pinned) = f.pins.get(&parent)
        {
            return Some(*pinned);
        }
        Some(f.current_version)
    }

    pub fn set_file_version(&mut self, file: &PhysicalId, version: u32) -> PathMapperResult<()> {
        let handle = self
            .handle_of(file)
            .ok_or_else(|| PathMapperError::UnknownItem { action: "Edit", id: file.clone() })?;
        match self.node_mut(handle) {
            Node::File(f) => {
                f.current_version = version;
                Ok(())
            }
            Node::Project(p) => Err(PathMapperError::NotAFile { id: p.id.clone() }),
        }
    }

    pub fn sharing_projects(&self, file: &PhysicalId) -> Vec<PhysicalId> {
        match self.handle_of(file).map(|h| self.node(h)) {
            Some(Node::File(f)) => f.sharing_set.iter().map(|&h| self.node(h).id().clone()).collect(),
            _ => Vec::new(),
        }
    }
}
