//! Crate-wide fatal error types.
//!
//! Per the error-handling policy: decoding and TLS-classification failures
//! never reach here — they're dropped or returned cleanly by
//! [`crate::handler`]. Only configuration, capture, and persistence
//! failures are fatal, matching the taxonomy of which layer is allowed to
//! terminate the process.

use std::path::PathBuf;

use thiserror::Error;

/// A fatal error: configuration, capture setup, or persistence I/O.
///
/// Any variant here is process-terminating. A caller driving the
/// [`crate::Harvester`] loop should map this to a non-zero exit code.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("output root `{path}` is not usable: {source}")]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open capture source: {0}")]
    Capture(#[source] anyhow::Error),

    #[error("failed to set BPF filter `{filter}`: {source}")]
    Bpf {
        filter: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("persistence failure writing `{path}`: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
