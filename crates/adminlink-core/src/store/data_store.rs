// ── Central reactive data store ──
//
// Holds the current mirror and publishes every change through a `watch`
// channel. Readers take `Arc` snapshots and never block the writer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::mirror::Mirror;
use super::reducer::reduce;
use crate::event::ServerEvent;
use crate::model::Session;
use crate::stream::MirrorStream;

/// Publishes the mirror to any number of readers.
///
/// Only the controller's bridge task writes; everything else reads.
pub struct DataStore {
    mirror: watch::Sender<Arc<Mirror>>,
    last_init: watch::Sender<Option<DateTime<Utc>>>,
    last_event: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub fn new() -> Self {
        let (mirror, _) = watch::channel(Arc::new(Mirror::default()));
        let (last_init, _) = watch::channel(None);
        let (last_event, _) = watch::channel(None);

        Self {
            mirror,
            last_init,
            last_event,
        }
    }

    /// Reduce `event` into the mirror. Returns whether anything changed;
    /// subscribers are only woken on change.
    pub fn apply(&self, event: &ServerEvent) -> bool {
        let changed = self.mirror.send_if_modified(|current| match reduce(current, event) {
            Some(next) => {
                *current = Arc::new(next);
                true
            }
            None => false,
        });

        let now = Utc::now();
        self.last_event.send_replace(Some(now));
        if matches!(event, ServerEvent::Init(_)) {
            self.last_init.send_replace(Some(now));
        }
        changed
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<Mirror> {
        self.mirror.borrow().clone()
    }

    pub fn sessions_snapshot(&self) -> Arc<Vec<Session>> {
        Arc::clone(&self.mirror.borrow().sessions)
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn session(&self, id: &str) -> Option<Session> {
        self.mirror.borrow().session(id).cloned()
    }

    pub fn is_ip_banned(&self, ip: &str) -> bool {
        self.mirror.borrow().is_ip_banned(ip)
    }

    pub fn alias_for(&self, session_id: &str) -> String {
        self.mirror.borrow().alias_for(session_id)
    }

    // ── Count accessors ──────────────────────────────────────────────

    pub fn session_count(&self) -> usize {
        self.mirror.borrow().session_count()
    }

    pub fn live_session_count(&self) -> usize {
        self.mirror.borrow().live_session_count()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&self) -> MirrorStream {
        MirrorStream::new(self.mirror.subscribe())
    }

    /// Observe `init` arrivals, including ones that left the mirror as it was.
    pub fn init_updates(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_init.subscribe()
    }

    // ── Metadata ─────────────────────────────────────────────────────

    /// When the last full snapshot arrived.
    pub fn last_init(&self) -> Option<DateTime<Utc>> {
        *self.last_init.borrow()
    }

    pub fn last_event(&self) -> Option<DateTime<Utc>> {
        *self.last_event.borrow()
    }

    /// Whether at least one `init` has been applied.
    pub fn is_seeded(&self) -> bool {
        self.last_init.borrow().is_some()
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
