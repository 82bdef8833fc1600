//! The single typed configuration surface (spec §6, §2.1 "Configuration").
//!
//! Grounded on the teacher's pattern of a plain settings struct validated
//! once at startup (`UserSettings`/`WorkspaceLoader`'s upfront filesystem
//! checks) rather than a lazily-validated config object threaded through
//! the engine; per spec §6 "Persisted state: None", there is no layered
//! config file here, unlike the teacher's TOML stack — this is the one
//! surface the CLI crate populates directly from `clap` arguments.

use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::exclude::ExcludeError;
use crate::exclude::ExcludeList;
use crate::ids::PhysicalId;
use crate::revision::Timestamp;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("legacy database root {0:?} does not exist")]
    LegacyRootNotFound(PathBuf),
    #[error("target directory {0:?} already contains a history and overwrite was not requested")]
    TargetAlreadyExists(PathBuf),
    #[error("invalid exclusion pattern")]
    Exclude(#[from] ExcludeError),
    #[error("unknown source encoding {0:?}")]
    UnknownEncoding(String),
    #[error("sameCommentWindow ({same}) must be >= anyCommentWindow ({any})")]
    WindowOrder { any: i64, same: i64 },
    #[error("fromDate must be <= toDate")]
    DateRangeInverted,
    #[error("backend {0:?} is not available in this build")]
    BackendUnavailable(&'static str),
    #[error("unknown backend {0:?}, expected native-process|managed-lib|streaming-pipe")]
    UnknownBackend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    NativeProcess,
    ManagedLib,
    StreamingPipe,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native-process" => Ok(Self::NativeProcess),
            "managed-lib" => Ok(Self::ManagedLib),
            "streaming-pipe" => Ok(Self::StreamingPipe),
            other => Err(format!("unknown backend {other:?}, expected native-process|managed-lib|streaming-pipe")),
        }
    }
}

/// Everything the engine needs for one run (spec §6 "External interfaces —
/// Inputs"). The CLI crate is the only place this is ever constructed from
/// untyped input (`clap` arguments); the library itself never reads
/// environment variables or files to populate it.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub legacy_db_root: PathBuf,
    pub target_dir: PathBuf,
    pub root_projects: Vec<PhysicalId>,
    pub exclude_raw: String,
    pub any_comment_window_secs: i64,
    pub same_comment_window_secs: i64,
    pub source_encoding: &'static encoding_rs::Encoding,
    pub transcode_comments: bool,
    pub default_comment: String,
    pub email_domain: String,
    pub force_annotated_tags: bool,
    pub export_project_to_git_root: bool,
    pub from_date: Option<Timestamp>,
    pub to_date: Option<Timestamp>,
    pub backend: BackendKind,
    pub ignore_errors: bool,
    pub commit_interval: u32,
    pub allow_existing_target: bool,
}

impl MigrationConfig {
    pub fn new(legacy_db_root: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            legacy_db_root: legacy_db_root.into(),
            target_dir: target_dir.into(),
            root_projects: vec![PhysicalId::new("$/")],
            exclude_raw: String::new(),
            any_comment_window_secs: 30,
            same_comment_window_secs: 600,
            source_encoding: encoding_rs::WINDOWS_1252,
            transcode_comments: true,
            default_comment: String::new(),
            email_domain: "legacy.invalid".to_string(),
            force_annotated_tags: false,
            export_project_to_git_root: true,
            from_date: None,
            to_date: None,
            backend: BackendKind::NativeProcess,
            ignore_errors: false,
            commit_interval: 1000,
            allow_existing_target: false,
        }
    }

    pub fn exclude_list(&self) -> Result<ExcludeList, ConfigError> {
        Ok(ExcludeList::parse(&self.exclude_raw)?)
    }

    /// Fatal, abort-before-any-work checks (spec §7 "Configuration" error
    /// kind).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.legacy_db_root.exists() {
            return Err(ConfigError::LegacyRootNotFound(self.legacy_db_root.clone()));
        }
        if !self.allow_existing_target && target_has_history(&self.target_dir) {
            return Err(ConfigError::TargetAlreadyExists(self.target_dir.clone()));
        }
        if self.same_comment_window_secs < self.any_comment_window_secs {
            return Err(ConfigError::WindowOrder {
                any: self.any_comment_window_secs,
                same: self.same_comment_window_secs,
            });
        }
        if let (Some(from), Some(to)) = (self.from_date, self.to_date)
            && from.epoch_secs() > to.epoch_secs()
        {
            return Err(ConfigError::DateRangeInverted);
        }
        self.exclude_list()?;
        Ok(())
    }
}

fn target_has_history(target_dir: &Path) -> bool {
    target_dir.join(".git").exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_parses_known_values() {
        assert_eq!("native-process".parse::<BackendKind>().unwrap(), BackendKind::NativeProcess);
        assert_eq!("managed-lib".parse::<BackendKind>().unwrap(), BackendKind::ManagedLib);
        assert_eq!("streaming-pipe".parse::<BackendKind>().unwrap(), BackendKind::StreamingPipe);
        assert!("bogus".parse::<BackendKind>().is_err());
    }

    #[test]
    fn validate_rejects_inverted_date_range() {
        let mut config = MigrationConfig::new(".", std::env::temp_dir().join("vss-migrate-cfg-test"));
        config.from_date = Some(Timestamp::from_epoch_secs(100));
        config.to_date = Some(Timestamp::from_epoch_secs(50));
        assert!(matches!(config.validate(), Err(ConfigError::DateRangeInverted)));
    }

    #[test]
    fn validate_rejects_inverted_windows() {
        let mut config = MigrationConfig::new(".", std::env::temp_dir().join("vss-migrate-cfg-test2"));
        config.any_comment_window_secs = 1000;
        config.same_comment_window_secs = 10;
        assert!(matches!(config.validate(), Err(ConfigError::WindowOrder { .. })));
    }
}
