//! A single, cloneable drain signal used to coordinate the 500ms
//! quiescence window (spec.md §4.1, §5) between the ingestion loop, the
//! stream handler tasks, and [`crate::persist::PersistWorker`].
//!
//! Adapted from the teacher's shutdown tripwire
//! (`core/lib/src/shutdown/tripwire.rs`); the mechanics are unchanged, only
//! the name and doc framing are specific to this crate's drain sequence.

use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::FusedFuture;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

#[doc(hidden)]
pub struct State {
    tripped: AtomicBool,
    notify: Notify,
}

/// A future that resolves once [`TripWire::trip`] has been called on any
/// clone of this wire.
#[must_use = "`TripWire` does nothing unless polled or `trip()`ed"]
pub struct TripWire {
    state: Arc<State>,
    event: Option<Pin<Box<Notified<'static>>>>,
}

impl Deref for TripWire {
    type Target = State;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl Clone for TripWire {
    fn clone(&self) -> Self {
        TripWire { state: self.state.clone(), event: None }
    }
}

impl Drop for TripWire {
    fn drop(&mut self) {
        // Drop the self-reference into `state` before `state` itself.
        self.event = None;
    }
}

impl fmt::Debug for TripWire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripWire").field("tripped", &self.tripped).finish()
    }
}

impl Future for TripWire {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.tripped() {
            self.event = None;
            return Poll::Ready(());
        }

        if self.event.is_none() {
            let notified = self.state.notify.notified();
            // SAFETY: this is a self-reference into `self.state`, which is
            // reference-counted and outlives `event` (dropped first, above).
            self.event = Some(Box::pin(unsafe { std::mem::transmute(notified) }));
        }

        if let Some(ref mut event) = self.event {
            if event.as_mut().poll(cx).is_ready() || self.tripped() {
                self.event = None;
                return Poll::Ready(());
            }
        }

        Poll::Pending
    }
}

impl FusedFuture for TripWire {
    fn is_terminated(&self) -> bool {
        self.tripped()
    }
}

impl Default for TripWire {
    fn default() -> Self {
        Self::new()
    }
}

impl TripWire {
    pub fn new() -> Self {
        TripWire {
            state: Arc::new(State { tripped: AtomicBool::new(false), notify: Notify::new() }),
            event: None,
        }
    }

    pub fn trip(&self) {
        self.tripped.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    #[inline(always)]
    pub fn tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::TripWire;

    #[test]
    fn is_send_sync_clone_unpin() {
        fn assert<T: Send + Sync + Clone + Unpin>() {}
        assert::<TripWire>();
    }

    #[tokio::test]
    async fn trip_then_await_resolves_immediately() {
        let wire = TripWire::new();
        wire.trip();
        wire.await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn clones_observe_a_single_trip() {
        let wire = TripWire::new();
        let mut tasks = Vec::new();
        for _ in 0..100 {
            tasks.push(tokio::spawn(wire.clone()));
        }

        wire.trip();
        for task in tasks {
            task.await.unwrap();
        }
    }
}
