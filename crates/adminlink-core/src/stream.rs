// ── Reactive mirror stream ──
//
// Subscription type for consuming mirror changes from the DataStore.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::Mirror;

/// A subscription to the mirror.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed`](Self::changed) or by converting to a `Stream`.
pub struct MirrorStream {
    current: Arc<Mirror>,
    receiver: watch::Receiver<Arc<Mirror>>,
}

impl MirrorStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Mirror>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &Arc<Mirror> {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<Mirror> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the DataStore has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Mirror>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> MirrorWatchStream {
        MirrorWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the current snapshot first, then a new one per mirror change.
pub struct MirrorWatchStream {
    inner: WatchStream<Arc<Mirror>>,
}

impl Stream for MirrorWatchStream {
    type Item = Arc<Mirror>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
