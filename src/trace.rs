//! Operational logging, kept strictly separate from the structured sighting
//! log persisted by [`crate::persist`] (that's a data artifact; this is
//! diagnostics). Uses the teacher's facade, [`tracing`], rather than the
//! bare [`log`] crate.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber.
///
/// Honors `RUST_LOG` if set (`EnvFilter::from_default_env`); otherwise logs
/// at `info` for this crate and `warn` for dependencies. Safe to call more
/// than once per process (later calls are no-ops) — convenient for tests
/// that each want logging enabled.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,certgrep=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
