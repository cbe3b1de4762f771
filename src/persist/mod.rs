//! Serializes certificate sightings to disk and to a structured sighting
//! log.
//!
//! A single task owns the output root and the log sink; stream handlers
//! reach it only through [`PersistHandle::submit`], matching spec.md's
//! single-writer ownership rule.

mod record;
mod worker;

pub use record::CertificateRecord;
pub use worker::{PersistContext, PersistHandle, PersistWorker};
