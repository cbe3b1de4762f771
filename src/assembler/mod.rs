//! TCP reassembly: coalesces segments into ordered per-direction byte
//! streams and invokes a factory once per new stream.
//!
//! Written in-crate rather than wrapping a general-purpose TCP-stream
//! reassembly library — the corpus has none to reuse, so (mirroring the
//! permissive TLS reader's own choice) this is focused and auditable rather
//! than vendored. Flow-keyed segment coalescing is grounded in
//! `other_examples`'s packet-decoding references for the surrounding
//! capture types; the reassembly algorithm itself is original to this
//! module.

mod factory;
mod stream;

pub use factory::{FlowIndex, StreamFactory};
pub use stream::{StreamSink, TcpSegment};

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::flow::{Direction, FlowKey};
use stream::Stream;

/// Buffers TCP segments into per-`(FlowKey, Direction)` streams and hands
/// each new stream to a [`StreamFactory`].
///
/// Bounds per-stream reorder-buffer memory at `max_reorder_buffer` bytes;
/// a stream that exceeds the cap is flushed early rather than allowed to
/// grow unboundedly on a pathological gap.
pub struct Assembler<F> {
    factory: F,
    flow_index: FlowIndex,
    max_reorder_buffer: usize,
    streams: HashMap<(FlowKey, Direction), Stream>,
}

impl<F: StreamFactory> Assembler<F> {
    pub fn new(factory: F, max_reorder_buffer: usize) -> Self {
        Assembler {
            factory,
            flow_index: FlowIndex::new(),
            max_reorder_buffer,
            streams: HashMap::new(),
        }
    }

    /// Buffers `segment` into its stream, creating the stream (and invoking
    /// the factory) on first sight of this half-flow.
    pub fn assemble(&mut self, flow_key: FlowKey, direction: Direction, segment: TcpSegment, now: Duration) {
        let key = (flow_key, direction);
        let closing = segment.fin || segment.rst;

        let exceeded = if let Some(stream) = self.streams.get_mut(&key) {
            stream.ingest(segment, now, self.max_reorder_buffer)
        } else {
            let (tx, rx) = mpsc::unbounded_channel();
            let idx = self.flow_index.next();
            self.factory.new_stream(flow_key, direction, idx, StreamSink::new(rx));

            let mut stream = Stream::new(tx, now);
            let exceeded = stream.ingest(segment, now, self.max_reorder_buffer);
            self.streams.insert(key, stream);
            exceeded
        };

        if exceeded {
            warn!(%flow_key, ?direction, "reorder buffer cap exceeded, flushing stream early");
        }

        if exceeded || closing {
            self.streams.remove(&key);
        }
    }

    /// Closes every stream whose last activity precedes `cutoff`, returning
    /// the count flushed.
    pub fn flush_older_than(&mut self, cutoff: Duration) -> usize {
        let stale: Vec<_> = self
            .streams
            .iter()
            .filter(|(_, s)| s.last_activity < cutoff)
            .map(|(k, _)| *k)
            .collect();

        for key in &stale {
            self.streams.remove(key);
        }

        stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::sync::{Arc, Mutex};

    use crate::flow::Endpoint;

    fn ep(ip: &str, port: u16) -> Endpoint {
        Endpoint { addr: ip.parse::<IpAddr>().unwrap(), port }
    }

    #[derive(Clone, Default)]
    struct RecordingFactory {
        created: Arc<Mutex<Vec<(FlowKey, Direction, u64)>>>,
    }

    impl StreamFactory for RecordingFactory {
        fn new_stream(&self, flow_key: FlowKey, direction: Direction, idx: u64, _sink: StreamSink) {
            self.created.lock().unwrap().push((flow_key, direction, idx));
        }
    }

    #[test]
    fn invokes_factory_once_per_new_half_flow() {
        let factory = RecordingFactory::default();
        let mut assembler = Assembler::new(factory.clone(), 4096);
        let flow = FlowKey::new(ep("10.0.0.1", 51000), ep("10.0.0.2", 443));
        let now = Duration::from_secs(0);

        let seg = TcpSegment { seq: 0, payload: b"hi".to_vec(), fin: false, rst: false };
        assembler.assemble(flow, Direction::ServerToClient, seg.clone(), now);
        assembler.assemble(flow, Direction::ServerToClient, seg, now);

        assert_eq!(factory.created.lock().unwrap().len(), 1);
    }

    #[test]
    fn flush_older_than_removes_stale_streams_only() {
        let factory = RecordingFactory::default();
        let mut assembler = Assembler::new(factory, 4096);
        let flow = FlowKey::new(ep("10.0.0.1", 51000), ep("10.0.0.2", 443));

        let old = Duration::from_secs(0);
        let seg = TcpSegment { seq: 0, payload: b"hi".to_vec(), fin: false, rst: false };
        assembler.assemble(flow, Direction::ServerToClient, seg, old);

        let cutoff = old + std::time::Duration::from_secs(1);
        let flushed = assembler.flush_older_than(cutoff);
        assert_eq!(flushed, 1);
        assert_eq!(assembler.flush_older_than(cutoff), 0);
    }

    #[test]
    fn fin_segment_closes_stream_immediately() {
        let factory = RecordingFactory::default();
        let mut assembler = Assembler::new(factory.clone(), 4096);
        let flow = FlowKey::new(ep("10.0.0.1", 51000), ep("10.0.0.2", 443));
        let now = Duration::from_secs(0);

        let seg = TcpSegment { seq: 0, payload: Vec::new(), fin: true, rst: false };
        assembler.assemble(flow, Direction::ServerToClient, seg, now);
        assert!(assembler.streams.is_empty());
    }
}
