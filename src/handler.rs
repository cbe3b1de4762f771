//! The stream handler: classifies a reassembled TCP stream and, if it's a
//! TLS server flight, drives the permissive TLS reader and submits whatever
//! certificates it finds.

use tokio::io::{AsyncReadExt, BufReader};
use tracing::debug;

use crate::assembler::StreamSink;
use crate::flow::{flow_hash, Direction, FlowKey};
use crate::persist::{CertificateRecord, PersistContext, PersistHandle};
use crate::tls::TlsReader;
use crate::transport::FakeTransport;

const PEEK_LEN: usize = 16;

/// Reads `sink` to EOF, classifying it and, if it matches a TLS server
/// flight, extracting certificates and submitting them to `persist`.
///
/// Returns cleanly on every path spec.md's edge-case table names: a short
/// stream, a non-matching stream, and a matching stream with no
/// certificates all just return without submitting anything.
pub async fn handle_stream(
    flow_key: FlowKey,
    direction: Direction,
    idx: u64,
    sink: StreamSink,
    persist: PersistHandle,
) {
    let mut reader = BufReader::new(sink);

    let mut peek = [0u8; PEEK_LEN];
    match reader.read_exact(&mut peek).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            debug!(idx, "stream shorter than peek window, ignoring");
            drain_to_eof(reader).await;
            return;
        }
        Err(e) => {
            debug!(idx, error = %e, "error peeking stream");
            return;
        }
    }

    if !crate::tls::looks_like_tls_handshake(&peek) {
        debug!(idx, "stream does not match a TLS server flight");
        drain_to_eof(prepend(peek, reader)).await;
        return;
    }

    let transport = FakeTransport::new(prepend(peek, reader));
    let mut tls_reader = TlsReader::new(transport);
    if let Err(e) = tls_reader.run().await {
        debug!(idx, error = %e, "TLS reader stopped");
    }

    let certificates: Vec<CertificateRecord> =
        tls_reader.into_certificates().into_iter().map(CertificateRecord::new).collect();

    if certificates.is_empty() {
        return;
    }

    let (server, client) = flow_key.endpoints(direction);
    let log_prefix = format!(
        "flowidx:{idx} flowhash:{:016x} client:{client} server:{server} port:{}",
        flow_hash(&flow_key),
        server.port,
    );

    debug!(idx, found = certificates.len(), "submitting certificates");
    persist.submit(PersistContext { certificates, log_prefix }).await;
}

/// Chains the already-peeked bytes back in front of the reader they came
/// from, so downstream consumers (the TLS reader, the discard drain) see
/// the full stream rather than missing its first 16 bytes.
fn prepend<R: tokio::io::AsyncRead + Unpin>(
    peeked: [u8; PEEK_LEN],
    rest: R,
) -> impl tokio::io::AsyncRead + Unpin {
    std::io::Cursor::new(peeked).chain(rest)
}

async fn drain_to_eof<R: tokio::io::AsyncRead + Unpin>(mut reader: R) {
    let mut sink = tokio::io::sink();
    let _ = tokio::io::copy(&mut reader, &mut sink).await;
}
