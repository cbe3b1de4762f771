use thiserror::Error;

/// Conditions the reader can run into while walking a captured handshake.
///
/// None of these are fatal to certificate emission: whatever certificates
/// were already collected via [`crate::tls::TlsReader::into_certificates`]
/// remain valid regardless of which variant (if any) stopped the reader.
/// The crypto-level variants mirror conditions a live, completing TLS
/// client can hit during key exchange and verification; this reader never
/// performs key exchange or verification, so in practice only
/// [`TlsError::Framing`] and [`TlsError::Eof`] occur, but the taxonomy is
/// kept complete for anyone extending the parser toward a live client later.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("record or handshake message framing error: {0}")]
    Framing(String),

    #[error("stream ended before a certificate message was seen")]
    Eof,

    #[error("peer sent an unexpected ClientHello")]
    UnexpectedClientHello,

    #[error("server key exchange message was expected but not present")]
    MissingServerKeyExchange,

    #[error("unsupported elliptic curve in key exchange")]
    UnsupportedCurve,

    #[error("unknown signature hash function")]
    UnknownHashFunction,

    #[error("RSA signature verification failed")]
    RsaVerification,

    #[error("ECDSA signature verification failed")]
    EcdsaVerification,

    #[error("record MAC did not verify")]
    BadRecordMac,
}
