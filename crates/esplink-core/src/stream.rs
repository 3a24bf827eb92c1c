// ── Reactive entity stream ──
//
// Subscription over the registry's snapshots, for hosts that want to follow
// discovery rather than poll `Gateway::entities()`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::EntityDescriptor;
use crate::registry::Snapshot;

/// A subscription to the entity registry.
///
/// Holds the snapshot seen at creation (or at the last `changed()`), and can
/// wait for the next reset or registration.
pub struct EntityStream {
    current: Snapshot,
    receiver: watch::Receiver<Snapshot>,
}

impl EntityStream {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// Wait for the next change. `None` once the gateway is gone.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Look up an entity in the current snapshot.
    pub fn find(&self, key: &str) -> Option<Arc<EntityDescriptor>> {
        self.current.iter().find(|d| d.key == key).cloned()
    }

    /// Convert into a `Stream`. The first item is the snapshot at the time
    /// of conversion.
    pub fn into_stream(self) -> EntityWatchStream {
        EntityWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding a snapshot per registry mutation.
pub struct EntityWatchStream {
    inner: WatchStream<Snapshot>,
}

impl Stream for EntityWatchStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
