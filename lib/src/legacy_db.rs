//! `LegacyDatabase`: the external, out-of-scope decoder of the legacy binary
//! format (spec §1, component A). The rest of the engine only ever talks to
//! this trait.
//!
//! Grounded on `backend.rs`'s `Backend` trait: one trait per external
//! collaborator, a dedicated `*Result` alias, a `#[derive(Error)]` error
//! type. Made synchronous (no `async_trait`) because spec §5 mandates a
//! single producer thread driving Analyzer → ChangesetBuilder → ReplayEngine
//! with no suspension anywhere in the pipeline; the teacher's `Backend` is
//! async because jj may batch concurrent reads against a remote object
//! store, which this spec has no concept of (component A is always local
//! and random-access per §2).

use thiserror::Error;

use crate::ids::PhysicalId;
use crate::revision::Item;
use crate::revision::Revision;

#[derive(Debug, Error)]
pub enum LegacyDbError {
    #[error("item {id} not found in legacy database")]
    ItemNotFound { id: PhysicalId },
    #[error("could not decode revision log for item {id}")]
    Decode {
        id: PhysicalId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("could not read content for item {id} at version {version}")]
    Content {
        id: PhysicalId,
        version: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type LegacyDbResult<T> = Result<T, LegacyDbError>;

/// Read-only, random-access view of the legacy database.
///
/// Implementations are expected to be cheap to clone/share (e.g. an `Arc`
/// around an open file handle or connection pool) since both the analyzer
/// and the replay engine hold a reference for the duration of the run
/// (spec §5: "The LegacyDatabase handle is likewise scoped to the run").
pub trait LegacyDatabase {
    /// Looks up an item's static metadata (kind, current logical name).
    fn item(&self, id: &PhysicalId) -> LegacyDbResult<Item>;

    /// Returns the full, already-decoded revision log for one item, in
    /// the order the legacy database stored them (not necessarily sorted
    /// across items; [`crate::analyzer::RevisionAnalyzer`] does the global
    /// sort).
    fn revisions(&self, id: &PhysicalId) -> LegacyDbResult<Vec<Revision>>;

    /// Reads the content bytes of a file at a specific version. Per spec
    /// §4.1 "Failure semantics", a missing/corrupt content blob is not an
    /// analyzer-time error: it surfaces here, lazily, when the replay
    /// engine actually needs the bytes.
    fn content(&self, id: &PhysicalId, version: u32) -> LegacyDbResult<Vec<u8>>;
}
