//! Terminal setup: `tracing-subscriber` installation and the final summary
//! report, grounded on the teacher's `ui.rs` split between log plumbing and
//! user-facing output.

use tracing_subscriber::EnvFilter;
use vss_migrate_lib::replay::Summary;

/// Installs a `tracing-subscriber` `fmt` layer driven by `RUST_LOG`, with
/// `-v`/`-vv` raising the default level when `RUST_LOG` is unset (spec §6
/// "Logging").
pub fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "vss_migrate=info",
        1 => "vss_migrate=debug,vss_migrate_lib=debug",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints the end-of-run summary to stdout.
pub fn report(summary: &Summary) {
    println!("revisions replayed:  {}", summary.revisions_seen);
    println!("changesets committed: {}", summary.changesets_committed);
    println!("tags created:         {}", summary.tags_created);
    println!("errors ignored:       {}", summary.errors_ignored);
}
