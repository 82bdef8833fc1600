//! `clap`-derived command-line surface, the one place untyped input is
//! turned into a [`MigrationConfig`] (spec §6 "Configuration").

use std::path::PathBuf;

use clap::Parser;
use vss_migrate_lib::config::BackendKind;
use vss_migrate_lib::config::ConfigError;
use vss_migrate_lib::config::MigrationConfig;
use vss_migrate_lib::ids::PhysicalId;
use vss_migrate_lib::revision::Timestamp;

/// Replays a legacy file-versioning database into a git repository.
#[derive(Parser, Debug)]
#[command(name = "vss-migrate", version, about, long_about = None)]
pub struct Args {
    /// Root of the legacy database (a JSON fixture directory; see
    /// `vss_migrate_lib::json_db` for the layout it expects).
    pub legacy_db_root: PathBuf,

    /// Directory the replayed history is written into.
    pub target_dir: PathBuf,

    /// Root project(s) to migrate, by physical id. Defaults to `$/`.
    #[arg(long = "root", value_name = "PHYSICAL_ID")]
    pub root_projects: Vec<String>,

    /// Semicolon-separated path-glob exclusion list, anchored at `$/`.
    #[arg(long, default_value = "")]
    pub exclude: String,

    /// Seconds within which two same-user revisions merge into one
    /// changeset regardless of comment.
    #[arg(long, default_value_t = 30)]
    pub any_comment_window_secs: i64,

    /// Seconds within which two same-user, same-comment revisions merge
    /// into one changeset.
    #[arg(long, default_value_t = 600)]
    pub same_comment_window_secs: i64,

    /// Legacy comment encoding, as an `encoding_rs` label (e.g.
    /// `windows-1252`, `shift_jis`).
    #[arg(long, default_value = "windows-1252")]
    pub source_encoding: String,

    /// Skip transcoding comments to UTF-8 and declaring `i18n.commitEncoding`.
    #[arg(long)]
    pub no_transcode_comments: bool,

    /// Commit message used when a changeset has no comment.
    #[arg(long, default_value = "")]
    pub default_comment: String,

    /// Domain used to synthesize `user@domain` author emails.
    #[arg(long, default_value = "legacy.invalid")]
    pub email_domain: String,

    /// Always create annotated tags, even for labels with no comment.
    #[arg(long)]
    pub force_annotated_tags: bool,

    /// When a single root project is migrated, keep it as a subdirectory
    /// of the target instead of exporting its contents to the git root.
    #[arg(long)]
    pub no_export_project_to_git_root: bool,

    /// Only replay revisions at or after this date (`YYYY-MM-DD`).
    #[arg(long, value_parser = parse_date)]
    pub from_date: Option<Timestamp>,

    /// Only replay revisions at or before this date (`YYYY-MM-DD`).
    #[arg(long, value_parser = parse_date)]
    pub to_date: Option<Timestamp>,

    /// History-writer backend to replay into.
    #[arg(long, default_value = "native-process")]
    pub backend: String,

    /// Treat every writer/content error as ignorable instead of aborting
    /// the run (spec §4.6 unattended mode).
    #[arg(long)]
    pub ignore_errors: bool,

    /// Exit with code 3 if any error was ignored during a successful run.
    #[arg(long)]
    pub strict: bool,

    /// Number of revisions accumulated in the working tree between commits.
    #[arg(long, default_value_t = 1000)]
    pub commit_interval: u32,

    /// Proceed even if `target_dir` already contains a `.git` directory.
    #[arg(long)]
    pub allow_existing_target: bool,

    /// Increase log verbosity; repeat for more detail.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_date(raw: &str) -> Result<Timestamp, String> {
    use chrono::NaiveDate;
    use chrono::TimeZone as _;
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("invalid date {raw:?}: {e}"))?;
    let datetime = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let utc = chrono::Utc.from_utc_datetime(&datetime);
    Ok(Timestamp::from_epoch_secs(utc.timestamp()))
}

/// Builds the engine's typed configuration from parsed arguments, applying
/// the same validation the spec assigns to component F (spec §6).
pub fn build_config(args: &Args) -> Result<MigrationConfig, ConfigError> {
    let backend: BackendKind = args
        .backend
        .parse()
        .map_err(|_| ConfigError::UnknownBackend(args.backend.clone()))?;
    let source_encoding = encoding_rs::Encoding::for_label(args.source_encoding.as_bytes())
        .ok_or_else(|| ConfigError::UnknownEncoding(args.source_encoding.clone()))?;

    let mut config = MigrationConfig::new(args.legacy_db_root.clone(), args.target_dir.clone());
    if !args.root_projects.is_empty() {
        config.root_projects = args.root_projects.iter().map(|s| PhysicalId::new(s.clone())).collect();
    }
    config.exclude_raw = args.exclude.clone();
    config.any_comment_window_secs = args.any_comment_window_secs;
    config.same_comment_window_secs = args.same_comment_window_secs;
    config.source_encoding = source_encoding;
    config.transcode_comments = !args.no_transcode_comments;
    config.default_comment = args.default_comment.clone();
    config.email_domain = args.email_domain.clone();
    config.force_annotated_tags = args.force_annotated_tags;
    config.export_project_to_git_root = !args.no_export_project_to_git_root;
    config.from_date = args.from_date;
    config.to_date = args.to_date;
    config.backend = backend;
    config.ignore_errors = args.ignore_errors;
    config.commit_interval = args.commit_interval;
    config.allow_existing_target = args.allow_existing_target;

    config.validate()?;
    Ok(config)
}
