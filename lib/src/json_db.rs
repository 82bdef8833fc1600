//! A directory-of-JSON-files [`LegacyDatabase`] (spec §1/§6, component A).
//!
//! The low-level decoder of the actual legacy binary format is an external
//! collaborator out of scope for this engine: the spec hands component A a
//! fixed contract and assumes *something* upstream already yields typed
//! `Item`/`Revision`/`Action` records. This is that something, in its
//! simplest possible shape, so the CLI has a real implementation to drive
//! rather than only a trait: a manifest listing every item, one revision
//! log per item, and one content blob per file version, all pre-decoded
//! JSON/bytes on disk. A production deployment swaps this module out for a
//! real VSS/SourceSafe reader without touching anything downstream.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::ids::PhysicalId;
use crate::legacy_db::LegacyDbError;
use crate::legacy_db::LegacyDbResult;
use crate::legacy_db::LegacyDatabase;
use crate::revision::Item;
use crate::revision::Revision;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    items: Vec<Item>,
}

/// Maps a [`PhysicalId`] to a filesystem-safe name. Not reversible; lookups
/// always go through the id, never the filename.
fn sanitize(id: &PhysicalId) -> String {
    let sanitized: String = id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    if sanitized.is_empty() { "_root".to_string() } else { sanitized }
}

/// Reads a legacy database from a directory laid out as:
///
/// ```text
/// <root>/manifest.json                      - [{ id, kind, logical_name }, ...]
/// <root>/revisions/<sanitized-id>.json       - [Revision, ...]
/// <root>/content/<sanitized-id>/<version>    - raw file bytes
/// ```
pub struct JsonLegacyDatabase {
    root: PathBuf,
    manifest: Manifest,
}

impl JsonLegacyDatabase {
    pub fn open(root: impl Into<PathBuf>) -> LegacyDbResult<Self> {
        let root = root.into();
        let manifest_path = root.join("manifest.json");
        let bytes = fs::read(&manifest_path).map_err(|source| LegacyDbError::Decode {
            id: PhysicalId::new(manifest_path.display().to_string()),
            source: Box::new(source),
        })?;
        let manifest: Manifest = serde_json::from_slice(&bytes).map_err(|source| LegacyDbError::Decode {
            id: PhysicalId::new(manifest_path.display().to_string()),
            source: Box::new(source),
        })?;
        Ok(Self { root, manifest })
    }

    fn revisions_path(&self, id: &PhysicalId) -> PathBuf {
        self.root.join("revisions").join(format!("{}.json", sanitize(id)))
    }

    fn content_path(&self, id: &PhysicalId, version: u32) -> PathBuf {
        self.root.join("content").join(sanitize(id)).join(version.to_string())
    }
}

impl LegacyDatabase for JsonLegacyDatabase {
    fn item(&self, id: &PhysicalId) -> LegacyDbResult<Item> {
        self.manifest
            .items
            .iter()
            .find(|item| &item.id == id)
            .cloned()
            .ok_or_else(|| LegacyDbError::ItemNotFound { id: id.clone() })
    }

    fn revisions(&self, id: &PhysicalId) -> LegacyDbResult<Vec<Revision>> {
        let path = self.revisions_path(id);
        let bytes = fs::read(&path).map_err(|source| LegacyDbError::Decode { id: id.clone(), source: Box::new(source) })?;
        serde_json::from_slice(&bytes).map_err(|source| LegacyDbError::Decode { id: id.clone(), source: Box::new(source) })
    }

    fn content(&self, id: &PhysicalId, version: u32) -> LegacyDbResult<Vec<u8>> {
        let path = self.content_path(id, version);
        fs::read(&path).map_err(|source| LegacyDbError::Content { id: id.clone(), version, source: Box::new(source) })
    }
}

/// True if `dir` looks like a [`JsonLegacyDatabase`] root (has a manifest).
pub fn looks_like_json_db(dir: &Path) -> bool {
    dir.join("manifest.json").is_file()
}
