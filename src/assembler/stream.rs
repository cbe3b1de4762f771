//! Per-(flow, direction) reassembly state and the reader handed to the
//! stream handler.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;

/// One TCP segment as decoded off the wire: a sequence number, its payload,
/// and the control flags the assembler cares about.
#[derive(Debug, Clone)]
pub struct TcpSegment {
    pub seq: u32,
    pub payload: Vec<u8>,
    pub fin: bool,
    pub rst: bool,
}

/// The handler-facing half of a stream.
///
/// An `AsyncRead` that yields payload bytes in TCP sequence order and then
/// EOF once the assembler closes (or flushes) the stream. Sequence gaps are
/// never surfaced as data — the handler only ever sees contiguous bytes.
pub struct StreamSink {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

impl StreamSink {
    /// Wraps the receiving half of the assembler's byte channel.
    ///
    /// Normally only [`super::Assembler`] constructs one of these per new
    /// half-flow; exposed publicly so fixtures (tests, the `demos/`
    /// example) can feed a handler a literal byte stream without standing
    /// up a full assembler.
    pub fn new(rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        StreamSink { rx, pending: Vec::new(), pos: 0 }
    }
}

impl AsyncRead for StreamSink {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        loop {
            if self.pos < self.pending.len() {
                let available = &self.pending[self.pos..];
                let n = available.len().min(buf.remaining());
                buf.put_slice(&available[..n]);
                self.pos += n;
                return Poll::Ready(Ok(()));
            }

            match self.rx.poll_recv(cx) {
                Poll::Ready(Some(chunk)) => {
                    self.pending = chunk;
                    self.pos = 0;
                    if self.pending.is_empty() {
                        continue;
                    }
                }
                Poll::Ready(None) => return Poll::Ready(Ok(())),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Assembler-side reassembly state for one `(FlowKey, Direction)` half.
pub(super) struct Stream {
    expected: u32,
    started: bool,
    buffered_bytes: usize,
    reorder: BTreeMap<u32, Vec<u8>>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    pub(super) last_activity: Duration,
}

impl Stream {
    pub(super) fn new(tx: mpsc::UnboundedSender<Vec<u8>>, now: Duration) -> Self {
        Stream {
            expected: 0,
            started: false,
            buffered_bytes: 0,
            reorder: BTreeMap::new(),
            tx,
            last_activity: now,
        }
    }

    /// Buffers `segment`, then pushes every now-contiguous run of payload to
    /// the handler. Returns `true` once `max_buffer` bytes are held
    /// unreleased, signalling the caller to flush this stream early.
    pub(super) fn ingest(&mut self, segment: TcpSegment, now: Duration, max_buffer: usize) -> bool {
        self.last_activity = now;

        if !self.started {
            self.expected = segment.seq;
            self.started = true;
        }

        let TcpSegment { mut seq, mut payload, fin, rst } = segment;

        if !payload.is_empty() {
            let behind = self.expected.wrapping_sub(seq);
            if behind > 0 {
                if (behind as usize) < payload.len() {
                    payload.drain(..behind as usize);
                    seq = self.expected;
                } else {
                    payload.clear();
                }
            }

            if !payload.is_empty() {
                self.buffered_bytes += payload.len();
                self.reorder.entry(seq).or_insert(payload);
            }
        }

        self.drain_contiguous();

        if fin || rst {
            // Dropping the sender would close the channel right away, but
            // `Assembler::assemble` still needs to decide whether to remove
            // this entry; the caller removes us from the table and `tx`
            // drops with `self`.
        }

        self.buffered_bytes > max_buffer
    }

    fn drain_contiguous(&mut self) {
        while let Some(seq) = self.reorder.keys().next().copied() {
            if seq != self.expected {
                break;
            }

            let chunk = self.reorder.remove(&seq).expect("key just observed present");
            self.buffered_bytes -= chunk.len();
            self.expected = self.expected.wrapping_add(chunk.len() as u32);
            // Unbounded: the ingestion task must never block on a handler.
            let _ = self.tx.send(chunk);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn segment(seq: u32, payload: &[u8]) -> TcpSegment {
        TcpSegment { seq, payload: payload.to_vec(), fin: false, rst: false }
    }

    #[tokio::test]
    async fn delivers_in_order_segments_contiguously() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = Stream::new(tx, Duration::from_secs(0));
        let mut sink = StreamSink::new(rx);

        stream.ingest(segment(0, b"hello "), Duration::from_secs(0), 1024);
        stream.ingest(segment(6, b"world"), Duration::from_secs(0), 1024);
        drop(stream);

        let mut out = Vec::new();
        sink.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn reorders_out_of_order_segments() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = Stream::new(tx, Duration::from_secs(0));
        let mut sink = StreamSink::new(rx);

        stream.ingest(segment(6, b"world"), Duration::from_secs(0), 1024);
        stream.ingest(segment(0, b"hello "), Duration::from_secs(0), 1024);
        drop(stream);

        let mut out = Vec::new();
        sink.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn drops_retransmitted_prefix() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = Stream::new(tx, Duration::from_secs(0));
        let mut sink = StreamSink::new(rx);

        stream.ingest(segment(0, b"hello "), Duration::from_secs(0), 1024);
        // Full retransmission of the already-delivered segment.
        stream.ingest(segment(0, b"hello "), Duration::from_secs(0), 1024);
        stream.ingest(segment(6, b"world"), Duration::from_secs(0), 1024);
        drop(stream);

        let mut out = Vec::new();
        sink.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn reports_buffer_cap_exceeded() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut stream = Stream::new(tx, Duration::from_secs(0));
        // Gap at seq 0 means nothing drains; bytes stay buffered.
        let exceeded = stream.ingest(segment(4, &[0u8; 8]), Duration::from_secs(0), 4);
        assert!(exceeded);
    }
}
