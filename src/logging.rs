//! Diagnostic logging to stderr.
//!
//! The filter comes from `GURU_LOG` (standard `tracing` directives). Without it
//! only warnings are shown, or debug output when verbose mode is on. Answer
//! text is written to stdout and never goes through this logger.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "GURU_LOG";

/// Installs the global subscriber. Calling it twice is harmless.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "guru=debug,chat_stream=debug,warn"
    } else {
        "warn"
    }
}
