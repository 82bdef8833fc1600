//! Command-line front-end: parses arguments, builds a [`MigrationConfig`],
//! and drives [`run_migration`] against a [`JsonLegacyDatabase`] opened from
//! `legacy_db_root`.

mod args;
mod ui;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use vss_migrate_lib::json_db::JsonLegacyDatabase;
use vss_migrate_lib::run_migration;

use crate::args::Args;

fn main() -> ExitCode {
    let args = Args::parse();
    ui::init_tracing(args.verbose);

    let config = match args::build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration error");
            return ExitCode::from(2);
        }
    };

    let db = match JsonLegacyDatabase::open(&config.legacy_db_root) {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "could not open legacy database");
            return ExitCode::from(2);
        }
    };

    match run_migration(&config, &db) {
        Ok(summary) => {
            ui::report(&summary);
            if args.strict && summary.errors_ignored > 0 {
                ExitCode::from(3)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!(error = %e, "migration failed");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
