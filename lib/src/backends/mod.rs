//! Concrete [`crate::history_writer::HistoryWriter`] implementations (spec
//! §4.5.1). `native_process` is the reference backend used by the CLI and
//! by the end-to-end scenario tests in `replay.rs`; `managed_lib` and
//! `streaming_pipe` are intentionally partial, as the distilled spec scopes
//! concrete backends out beyond exercising the abstract contract (§1).

pub mod memory;
pub mod native_process;
pub mod streaming_pipe;

#[cfg(feature = "git")]
pub mod managed_lib;
