//! Exclusion glob matching (spec §4.1 item 4): patterns anchored at the path
//! root, `?` = one segment char, `*` = within-segment wildcard, `**` = any
//! depth, case-insensitive, matched against a complete path segment rather
//! than a substring.
//!
//! Grounded on the teacher's own `globset`/`ignore` workspace dependencies
//! (declared in `examples/yuja-jj/Cargo.toml`, used by jj-lib for its own
//! ignore-file matching). `globset::Glob` natively supports the `?`/`*`/`**`
//! semantics spec'd here; we only need to wire up case-insensitivity and
//! anchor each pattern at the start of the path.

use globset::Glob;
use globset::GlobMatcher;
use thiserror::Error;

use crate::path::LogicalPath;

#[derive(Debug, Error)]
pub enum ExcludeError {
    #[error("invalid exclusion glob {pattern:?}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// A compiled list of exclusion globs, semicolon-separated in the raw
/// configuration string (spec §6).
pub struct ExcludeList {
    matchers: Vec<GlobMatcher>,
}

impl ExcludeList {
    pub fn empty() -> Self {
        Self { matchers: Vec::new() }
    }

    /// Parses a semicolon-separated glob list. Each pattern is anchored at
    /// the start of the rooted path (`$/...`) by prepending `$/` when the
    /// caller's pattern doesn't already start with it, so `Folder/*.tmp`
    /// behaves the same whether or not the user spelled out the root.
    pub fn parse(raw: &str) -> Result<Self, ExcludeError> {
        let mut matchers = Vec::new();
        for pattern in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let anchored = if pattern.starts_with('$') {
                pattern.to_string()
            } else {
                format!("$/{pattern}")
            };
            let glob = Glob::builder(&anchored)
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .map_err(|source| ExcludeError::InvalidGlob {
                    pattern: pattern.to_string(),
                    source,
                })?;
            matchers.push(glob.compile_matcher());
        }
        Ok(Self { matchers })
    }

    /// True iff `path` matches any configured exclusion pattern. Per spec,
    /// a match drops *all* of the file's revisions from scope — the caller
    /// is responsible for that propagation; this only answers "does this
    /// rooted path match".
    pub fn matches(&self, path: &LogicalPath) -> bool {
        let rooted = path.display_rooted();
        self.matchers.iter().any(|m| m.is_match(&rooted))
    }
}
