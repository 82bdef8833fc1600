//! A `/`-separated virtual path type for the working tree that PathMapper
//! projects, with case-insensitive component comparison (spec §3, §9:
//! "Case-insensitive comparisons... must be explicit rather than relying on
//! any ambient culture").
//!
//! Grounded on `repo_path.rs`'s split between an owned, validated path and
//! its components, minus the `ref_cast` borrow machinery: at this scope a
//! plain `Vec<String>` of components is simpler and just as correct.

use std::fmt;

/// A single path segment. Never empty, never contains `/`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Component(String);

impl Component {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        assert!(!value.is_empty(), "path component must not be empty");
        assert!(!value.contains('/'), "path component must not contain '/'");
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive equality, used for logical-name uniqueness checks
    /// and tag/label comparisons per spec §9.
    pub fn eq_ignore_case(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

/// A virtual working path, rooted but not tied to any real filesystem until
/// [`LogicalPath::to_native`] is called.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct LogicalPath {
    components: Vec<Component>,
}

impl LogicalPath {
    pub fn root() -> Self {
        Self { components: Vec::new() }
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn join(&self, name: impl Into<String>) -> Self {
        let mut components = self.components.clone();
        components.push(Component::new(name));
        Self { components }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.components.is_empty() {
            return None;
        }
        let mut components = self.components.clone();
        components.pop();
        Some(Self { components })
    }

    pub fn file_name(&self) -> Option<&Component> {
        self.components.last()
    }

    /// Returns a copy of this path with its last component replaced.
    pub fn with_file_name(&self, name: impl Into<String>) -> Self {
        let mut components = self.components.clone();
        if components.is_empty() {
            components.push(Component::new(name));
        } else {
            *components.last_mut().unwrap() = Component::new(name);
        }
        Self { components }
    }

    /// True iff `self` is `other`, or a descendant of `other`.
    pub fn starts_with(&self, other: &Self) -> bool {
        other.components.len() <= self.components.len()
            && self.components[..other.components.len()] == other.components[..]
    }

    /// Rewrites the `old_prefix` prefix of `self` to `new_prefix`, if
    /// present, comparing the prefix case-insensitively (spec §4.4: "after
    /// the move, translate any `pendingChangedPaths` entries still
    /// referring to the old prefix to the new prefix (case-insensitively)").
    pub fn reprefix(&self, old_prefix: &Self, new_prefix: &Self) -> Option<Self> {
        if old_prefix.components.len() > self.components.len() {
            return None;
        }
        let matches = self.components[..old_prefix.components.len()]
            .iter()
            .zip(&old_prefix.components)
            .all(|(a, b)| a.eq_ignore_case(b));
        if !matches {
            return None;
        }
        let mut components = new_prefix.components.clone();
        components.extend_from_slice(&self.components[old_prefix.components.len()..]);
        Some(Self { components })
    }

    /// Renders as a slash-separated string rooted at `$/`, the legacy
    /// convention used by exclusion glob matching (spec §4.1 item 4).
    pub fn display_rooted(&self) -> String {
        let mut s = String::from("$");
        for c in &self.components {
            s.push('/');
            s.push_str(c.as_str());
        }
        s
    }

    /// Native filesystem path relative to `base`.
    pub fn to_native(&self, base: &std::path::Path) -> std::path::PathBuf {
        let mut p = base.to_path_buf();
        for c in &self.components {
            p.push(c.as_str());
        }
        p
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        let joined = self
            .components
            .iter()
            .map(Component::as_str)
            .collect::<Vec<_>>()
            .join("/");
        f.write_str(&joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reprefix_rewrites_case_insensitively() {
        let old = LogicalPath::root().join("FolderA");
        let new = LogicalPath::root().join("FolderRenamed");
        let path = old.join("SubDir").join("nested.txt");
        let rewritten = path.reprefix(&old, &new).unwrap();
        assert_eq!(rewritten.to_string(), "FolderRenamed/SubDir/nested.txt");
    }

    #[test]
    fn reprefix_none_when_not_a_descendant() {
        let old = LogicalPath::root().join("FolderA");
        let new = LogicalPath::root().join("FolderB");
        let unrelated = LogicalPath::root().join("Other").join("file.txt");
        assert!(unrelated.reprefix(&old, &new).is_none());
    }

    #[test]
    fn starts_with_self() {
        let p = LogicalPath::root().join("a").join("b");
        assert!(p.starts_with(&p));
        assert!(p.starts_with(&LogicalPath::root().join("a")));
        assert!(!LogicalPath::root().join("a").starts_with(&p));
    }
}
