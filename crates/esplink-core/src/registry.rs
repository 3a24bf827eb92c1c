// ── Entity registry ──
//
// Ordered descriptors for the current connection epoch, plus the per-entity
// handlers that consume keyed state and error events. The registry is owned
// by the event loop; hosts read it through `watch` snapshots.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::debug;

use esplink_api::{LogLevel, Payload};

use crate::model::EntityDescriptor;

type StateHandler = Box<dyn Fn(Payload) + Send + Sync>;
type ErrorHandler = Box<dyn Fn(&str) + Send + Sync>;

/// Typed callbacks attached to one advertised entity.
pub struct EntityHandlers {
    on_state: StateHandler,
    on_error: ErrorHandler,
}

impl EntityHandlers {
    pub fn new(
        on_state: impl Fn(Payload) + Send + Sync + 'static,
        on_error: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_state: Box::new(on_state),
            on_error: Box::new(on_error),
        }
    }
}

impl fmt::Debug for EntityHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityHandlers").finish_non_exhaustive()
    }
}

/// Which synthetic entries `reset()` seeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyntheticEntities {
    /// Log streaming level; `None` means no `logs` entity.
    pub logs: Option<LogLevel>,
    /// Seed the `ble` entity.
    pub ble: bool,
}

#[derive(Debug)]
struct Entry {
    descriptor: Arc<EntityDescriptor>,
    handlers: Option<EntityHandlers>,
}

pub type Snapshot = Arc<Vec<Arc<EntityDescriptor>>>;

/// Entities known for the current epoch, in discovery order.
#[derive(Debug)]
pub struct EntityRegistry {
    synthetic: SyntheticEntities,
    entries: IndexMap<String, Entry>,

    /// Number of resets performed.
    epoch: watch::Sender<u64>,

    /// Full snapshot, rebuilt on every mutation.
    snapshot: watch::Sender<Snapshot>,
}

impl EntityRegistry {
    pub fn new(synthetic: SyntheticEntities) -> Self {
        let (epoch, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            synthetic,
            entries: IndexMap::new(),
            epoch,
            snapshot,
        }
    }

    pub fn synthetic(&self) -> SyntheticEntities {
        self.synthetic
    }

    /// Start a new epoch: drop every descriptor and handler, then seed
    /// `logs` and `ble` if their subsystems are enabled.
    pub fn reset(&mut self) {
        self.entries.clear();
        if let Some(level) = self.synthetic.logs {
            self.insert(EntityDescriptor::logs(level), None);
        }
        if self.synthetic.ble {
            self.insert(EntityDescriptor::ble(), None);
        }
        self.epoch.send_modify(|e| *e += 1);
        self.rebuild_snapshot();
        debug!(epoch = self.epoch(), seeded = self.entries.len(), "registry reset");
    }

    /// Add a device-reported entity. A re-announced key replaces its
    /// descriptor and handlers without moving.
    pub fn register(&mut self, descriptor: EntityDescriptor, handlers: EntityHandlers) {
        self.insert(descriptor, Some(handlers));
        self.rebuild_snapshot();
    }

    /// Route a state payload to the entity's handler. Returns `false` when
    /// no handler is registered under `key` this epoch.
    pub fn dispatch_state(&self, key: &str, payload: Payload) -> bool {
        match self.handlers(key) {
            Some(h) => {
                (h.on_state)(payload);
                true
            }
            None => false,
        }
    }

    /// Route an entity error to its handler. Returns `false` when unknown.
    pub fn dispatch_error(&self, key: &str, message: &str) -> bool {
        match self.handlers(key) {
            Some(h) => {
                (h.on_error)(message);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<EntityDescriptor>> {
        self.entries.get(key).map(|e| Arc::clone(&e.descriptor))
    }

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    pub fn epoch(&self) -> u64 {
        *self.epoch.borrow()
    }

    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> {
        self.epoch.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn handlers(&self, key: &str) -> Option<&EntityHandlers> {
        self.entries.get(key)?.handlers.as_ref()
    }

    fn insert(&mut self, descriptor: EntityDescriptor, handlers: Option<EntityHandlers>) {
        let entry = Entry {
            descriptor: Arc::new(descriptor),
            handlers,
        };
        // `IndexMap::insert` keeps the existing slot for an existing key.
        self.entries.insert(entry.descriptor.key.clone(), entry);
    }

    fn rebuild_snapshot(&self) {
        let values: Vec<_> = self
            .entries
            .values()
            .map(|e| Arc::clone(&e.descriptor))
            .collect();
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}
