//! `tracing` + `tracing-subscriber` setup (spec §7a): `fmt` layer filtered by
//! `RUST_LOG`, falling back to a sensible default when unset so `--verbose`
//! works out of the box without requiring the env var.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Safe to call more than once per process;
/// later calls are no-ops (tests may each want logging without racing to set
/// it up first).
pub fn init(verbose: bool) {
    let default_level = if verbose { "uniast=debug,info" } else { "uniast=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
