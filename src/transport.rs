//! A half-duplex transport that makes [`crate::tls::TlsReader`] believe it
//! is talking to a live peer, when really it is only ever replaying an
//! already-captured byte stream.
//!
//! Reads are satisfied from the wrapped stream; writes (the `ClientHello`
//! the reader never actually needs to send anywhere) are silently accepted
//! and discarded. Grounded in the original capture tool's `FakeConn`, which
//! plays the same role around a real TLS client implementation.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Wraps a buffered, read-only byte source `T` and presents it as a
/// bidirectional transport. Every write reports success immediately without
/// touching `T`.
pub struct FakeTransport<T> {
    inner: T,
}

impl<T> FakeTransport<T> {
    pub fn new(inner: T) -> Self {
        FakeTransport { inner }
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for FakeTransport<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<T: Unpin> AsyncWrite for FakeTransport<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn reads_pass_through_from_inner() {
        let mut transport = FakeTransport::new(Cursor::new(vec![1, 2, 3, 4]));
        let mut buf = [0u8; 4];
        transport.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn writes_are_accepted_and_discarded() {
        let mut transport = FakeTransport::new(Cursor::new(Vec::<u8>::new()));
        let n = transport.write(b"client hello").await.unwrap();
        assert_eq!(n, b"client hello".len());
    }
}
