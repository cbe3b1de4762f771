//! TLS record layer: the 5-byte header every TLS record begins with.

use std::io;

/// A TLS record content type (the first header byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    ChangeCipherSpec,
    Alert,
    Handshake,
    ApplicationData,
    Unknown(u8),
}

impl From<u8> for ContentType {
    fn from(b: u8) -> Self {
        match b {
            20 => ContentType::ChangeCipherSpec,
            21 => ContentType::Alert,
            22 => ContentType::Handshake,
            23 => ContentType::ApplicationData,
            other => ContentType::Unknown(other),
        }
    }
}

/// The record-layer version: major is always `3`; minor distinguishes SSL
/// 3.0 (`0`) from TLS 1.0/1.1/1.2 (`1`/`2`/`3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    /// `true` for the four versions this reader recognizes: SSL 3.0, TLS
    /// 1.0, TLS 1.1, TLS 1.2.
    pub fn is_supported(self) -> bool {
        self.major == 3 && self.minor <= 3
    }
}

/// A parsed record header plus its (still encoded) fragment.
#[derive(Debug)]
pub struct Record {
    pub content_type: ContentType,
    pub version: ProtocolVersion,
    pub fragment: Vec<u8>,
}

/// Maximum plausible TLS record fragment size (2^14 plaintext, plus slack
/// for the compression/encryption this reader never performs). Records
/// claiming a larger length are treated as framing errors rather than
/// trusted with an unbounded allocation.
pub const MAX_FRAGMENT_LEN: usize = 18 * 1024;

pub const HEADER_LEN: usize = 5;

/// Parses a 5-byte record header. `header` must be exactly
/// [`HEADER_LEN`] bytes.
pub fn parse_header(header: &[u8]) -> io::Result<(ContentType, ProtocolVersion, usize)> {
    debug_assert_eq!(header.len(), HEADER_LEN);

    let content_type = ContentType::from(header[0]);
    let version = ProtocolVersion { major: header[1], minor: header[2] };
    let len = u16::from_be_bytes([header[3], header[4]]) as usize;

    if !version.is_supported() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported record version {}.{}", version.major, version.minor),
        ));
    }

    if len > MAX_FRAGMENT_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("record fragment length {len} exceeds maximum"),
        ));
    }

    Ok((content_type, version, len))
}

/// The 16-byte prefix a server-side TLS handshake flight begins with,
/// equivalent to the regular expression `^\x16\x03[\x00-\x03].*`:
/// content-type `Handshake` (`0x16`), record-layer major version `3`, minor
/// version `0`-`3`.
pub fn looks_like_tls_handshake(prefix: &[u8]) -> bool {
    prefix.len() >= 3 && prefix[0] == 22 && prefix[1] == 3 && prefix[2] <= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_handshake_prefix() {
        let prefix = [0x16, 0x03, 0x01, 0x00, 0x8A, 0x02, 0x00, 0x00, 0x46,
                      0x03, 0x01, 0x5A, 0x5A, 0x5A, 0x5A, 0x5A];
        assert!(looks_like_tls_handshake(&prefix));
    }

    #[test]
    fn rejects_non_handshake_content_type() {
        let prefix = [0x17, 0x03, 0x01, 0x00, 0x10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(!looks_like_tls_handshake(&prefix));
    }

    #[test]
    fn rejects_unsupported_minor_version() {
        let prefix = [0x16, 0x03, 0x04, 0x00, 0x10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(!looks_like_tls_handshake(&prefix));
    }
}
