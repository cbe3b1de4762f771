use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use super::error::TlsError;
use super::handshake::{self, HandshakeType};
use super::record::{self, ContentType};

/// Walks a captured server-to-client byte stream far enough to recover the
/// `Certificate` handshake message, then stops.
///
/// `run` never fails in a way that discards certificates already found:
/// callers should call [`TlsReader::into_certificates`] regardless of
/// `run`'s result.
pub struct TlsReader<T> {
    transport: T,
    handshake_buf: Vec<u8>,
    certificates: Vec<Vec<u8>>,
    done: bool,
}

impl<T: AsyncRead + Unpin> TlsReader<T> {
    pub fn new(transport: T) -> Self {
        TlsReader { transport, handshake_buf: Vec::new(), certificates: Vec::new(), done: false }
    }

    /// Reads records until a `Certificate` message has been parsed, the
    /// stream ends, or a framing error occurs.
    pub async fn run(&mut self) -> Result<(), TlsError> {
        while !self.done {
            let fragment = match self.read_record().await? {
                Some(fragment) => fragment,
                None => return Err(TlsError::Eof),
            };
            self.handshake_buf.extend_from_slice(&fragment);
            self.drain_handshake_messages()?;
        }
        Ok(())
    }

    /// Consumes the reader and returns every certificate DER found, leaf
    /// first, in chain order. Valid to call whether or not `run` returned
    /// `Ok`.
    pub fn into_certificates(self) -> Vec<Vec<u8>> {
        self.certificates
    }

    async fn read_record(&mut self) -> Result<Option<Vec<u8>>, TlsError> {
        let mut header = [0u8; record::HEADER_LEN];
        if let Err(err) = self.transport.read_exact(&mut header).await {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                return Ok(None);
            }
            return Err(TlsError::Framing(err.to_string()));
        }

        let (content_type, _version, len) =
            record::parse_header(&header).map_err(|e| TlsError::Framing(e.to_string()))?;

        let mut fragment = vec![0u8; len];
        self.transport
            .read_exact(&mut fragment)
            .await
            .map_err(|e| TlsError::Framing(e.to_string()))?;

        match content_type {
            ContentType::Handshake => Ok(Some(fragment)),
            other => {
                debug!(?other, "skipping non-handshake record");
                Ok(Some(Vec::new()))
            }
        }
    }

    fn drain_handshake_messages(&mut self) -> Result<(), TlsError> {
        loop {
            let header = match handshake::try_parse_header(&self.handshake_buf) {
                Some(header) => header,
                None => return Ok(()),
            };

            let total = handshake::HEADER_LEN + header.body_len;
            if self.handshake_buf.len() < total {
                return Ok(());
            }

            let body = self.handshake_buf[handshake::HEADER_LEN..total].to_vec();

            match header.kind {
                HandshakeType::ServerHello => {
                    debug!("saw ServerHello");
                }
                HandshakeType::Certificate => {
                    self.certificates = handshake::parse_certificate_body(&body)?;
                    self.done = true;
                }
                HandshakeType::Other(kind) => {
                    debug!(kind, "skipping unrecognized handshake message");
                }
            }

            self.handshake_buf.drain(..total);

            if self.done {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(content_type: u8, body: &[u8]) -> Vec<u8> {
        let len = (body.len() as u16).to_be_bytes();
        let mut out = vec![content_type, 3, 3, len[0], len[1]];
        out.extend_from_slice(body);
        out
    }

    fn handshake_message(kind: u8, body: &[u8]) -> Vec<u8> {
        let len = (body.len() as u32).to_be_bytes();
        let mut out = vec![kind, len[1], len[2], len[3]];
        out.extend_from_slice(body);
        out
    }

    fn certificate_entry(der: &[u8]) -> Vec<u8> {
        let len = (der.len() as u32).to_be_bytes();
        let mut out = vec![len[1], len[2], len[3]];
        out.extend_from_slice(der);
        out
    }

    #[tokio::test]
    async fn recovers_certificate_after_server_hello() {
        let leaf = vec![0x30u8; 20];
        let entry = certificate_entry(&leaf);
        let chain_len = (entry.len() as u32).to_be_bytes();
        let mut cert_body = vec![chain_len[1], chain_len[2], chain_len[3]];
        cert_body.extend_from_slice(&entry);

        let mut stream = Vec::new();
        stream.extend(record(22, &handshake_message(2, &[0u8; 4])));
        stream.extend(record(22, &handshake_message(11, &cert_body)));

        let mut reader = TlsReader::new(Cursor::new(stream));
        reader.run().await.unwrap();
        assert_eq!(reader.into_certificates(), vec![leaf]);
    }

    #[tokio::test]
    async fn eof_before_certificate_yields_no_certificates_but_no_panic() {
        let stream = record(22, &handshake_message(2, &[0u8; 4]));
        let mut reader = TlsReader::new(Cursor::new(stream));
        let result = reader.run().await;
        assert!(matches!(result, Err(TlsError::Eof)));
        assert!(reader.into_certificates().is_empty());
    }

    #[tokio::test]
    async fn handshake_message_split_across_two_records() {
        let leaf = vec![0xABu8; 16];
        let entry = certificate_entry(&leaf);
        let chain_len = (entry.len() as u32).to_be_bytes();
        let mut cert_body = vec![chain_len[1], chain_len[2], chain_len[3]];
        cert_body.extend_from_slice(&entry);
        let message = handshake_message(11, &cert_body);

        let (first, second) = message.split_at(message.len() / 2);
        let mut stream = Vec::new();
        stream.extend(record(22, first));
        stream.extend(record(22, second));

        let mut reader = TlsReader::new(Cursor::new(stream));
        reader.run().await.unwrap();
        assert_eq!(reader.into_certificates(), vec![leaf]);
    }
}
