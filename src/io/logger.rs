//! Tracing subscriber setup for the command-line tool

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter directive for the requested verbosity
pub const fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "neuroconn=warn"
    } else if verbose {
        "neuroconn=debug,info"
    } else {
        "neuroconn=info"
    }
}

/// Install a compact stderr logger
///
/// `RUST_LOG` takes precedence over the verbosity flags. Returns `false` if a
/// global subscriber was already installed.
pub fn init_cli_logger(verbose: bool, quiet: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .is_ok()
}
