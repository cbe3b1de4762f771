//! A permissive, client-impersonating TLS 1.0/1.1/1.2 (and SSL 3.0)
//! handshake reader.
//!
//! This is **not** a TLS client in the usual sense: it never sends a
//! `ClientHello` (the transport discards every write — see
//! [`crate::transport::FakeTransport`]) and never completes a handshake. It
//! exists solely to walk a captured server-to-client byte stream, recognize
//! record framing and the `ServerHello`/`Certificate` handshake messages,
//! and surface the certificate chain in [`TlsReader::into_certificates`].
//!
//! Chosen over forking an existing TLS stack (spec's alternative path) for
//! auditability: the parser only needs to understand record framing and
//! two handshake message types, so a from-scratch implementation is both
//! smaller and easier to reason about than a patched general-purpose
//! client — grounded in the same record/handshake parsing style the
//! teacher uses for SNI extraction (`core/http/src/tls/parse.rs`), widened
//! from client-hello-only to the server's first flight.

mod error;
mod handshake;
mod reader;
mod record;

pub use error::TlsError;
pub use reader::TlsReader;
pub use record::{looks_like_tls_handshake, ContentType, ProtocolVersion};
