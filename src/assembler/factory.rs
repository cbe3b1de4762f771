use std::sync::atomic::{AtomicU64, Ordering};

use crate::flow::{Direction, FlowKey};

use super::stream::StreamSink;

/// Invoked once per newly observed `(FlowKey, Direction)` half-flow.
///
/// Implementations typically spawn a stream handler task that reads the
/// given [`StreamSink`] to EOF.
pub trait StreamFactory: Send + Sync {
    fn new_stream(&self, flow_key: FlowKey, direction: Direction, idx: u64, sink: StreamSink);
}

/// The monotonically increasing, process-lifetime-unique index assigned to
/// each new half-flow.
///
/// Owned by the [`super::Assembler`] that creates streams, not a
/// process-global — two assemblers in the same process (e.g. one per test)
/// never observe each other's counts.
#[derive(Default)]
pub struct FlowIndex(AtomicU64);

impl FlowIndex {
    pub fn new() -> Self {
        FlowIndex(AtomicU64::new(0))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_strictly_increasing_indices() {
        let index = FlowIndex::new();
        let a = index.next();
        let b = index.next();
        let c = index.next();
        assert!(a < b && b < c);
    }
}
