//! Concurrent session cache with lazy, rate-limited expiration.
//!
//! # Responsibilities
//! - Map session ids to live sessions plus a last-access timestamp
//! - Expire idle entries on access
//! - Bound cleanup cost with a purge sweep run at most once per interval
//!
//! # Design Decisions
//! - One mutex guards the whole store, so an entry is present iff it has a
//!   last-access timestamp and a `put` racing a `get`/`put` for the same id
//!   can never leave the two apart
//! - Monotonic `Instant`s drive expiry; wall-clock time is never consulted
//! - Lookups for unknown or expired ids create a fresh session instead of
//!   erroring

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::session::store::Session;

/// Lifetimes and purge pacing for a [`SessionCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Idle lifetime after which an entry expires. Zero = never expires.
    pub lifetime: Duration,
    /// Minimum time between full purge sweeps.
    pub purge_interval: Duration,
}

struct Entry {
    session: Arc<Session>,
    last_access: Instant,
}

struct Inner {
    entries: HashMap<String, Entry>,
    last_purge: Instant,
}

/// Time-based eviction cache mapping session ids to session state.
///
/// Created once per server instance and shared by every connection worker.
pub struct SessionCache {
    lifetime: Duration,
    purge_interval: Duration,
    inner: Mutex<Inner>,
}

impl SessionCache {
    /// Create a cache with the given lifetimes.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            lifetime: config.lifetime,
            purge_interval: config.purge_interval,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                last_purge: Instant::now(),
            }),
        }
    }

    /// Resolve the session for `id`, refreshing its access time.
    ///
    /// A `None`, unknown, or expired id yields a brand-new session with a
    /// fresh unique identifier; the caller can detect this by comparing the
    /// returned session's id to the one it presented.
    pub fn get(&self, id: Option<&str>) -> Arc<Session> {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("session cache lock poisoned");
        self.purge_locked(&mut inner, now);

        if let Some(id) = id {
            if let Some(entry) = inner.entries.get_mut(id) {
                if !self.is_expired(entry.last_access, now) {
                    entry.last_access = now;
                    return Arc::clone(&entry.session);
                }
            }
        }

        let session = Arc::new(Session::new());
        inner.entries.insert(
            session.id().to_string(),
            Entry {
                session: Arc::clone(&session),
                last_access: now,
            },
        );
        session
    }

    /// Store `session` under its own id.
    ///
    /// When a live entry already exists for that id, the stored session's
    /// attributes are merged onto the incoming one first (stored data wins)
    /// and the previously stored session is returned. `None` signals first
    /// use of this id: there was no entry, or only an expired one, which is
    /// evicted.
    pub fn put(&self, session: Session) -> Option<Arc<Session>> {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("session cache lock poisoned");

        let previous = match inner.entries.remove(session.id()) {
            Some(entry) if !self.is_expired(entry.last_access, now) => {
                session.absorb(&entry.session);
                Some(entry.session)
            }
            // Expired entry: evict silently, treat as first use.
            _ => None,
        };

        inner.entries.insert(
            session.id().to_string(),
            Entry {
                session: Arc::new(session),
                last_access: now,
            },
        );
        self.purge_locked(&mut inner, now);
        previous
    }

    /// Number of live entries (counts expired-but-not-yet-purged ones).
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("session cache lock poisoned")
            .entries
            .len()
    }

    /// True when the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, last_access: Instant, now: Instant) -> bool {
        !self.lifetime.is_zero() && now.duration_since(last_access) > self.lifetime
    }

    /// Evict every expired entry, at most once per purge interval.
    ///
    /// No-op when the lifetime is zero. The scan snapshots the expired ids
    /// first so eviction never observes a half-updated table.
    fn purge_locked(&self, inner: &mut Inner, now: Instant) {
        if self.lifetime.is_zero() {
            return;
        }
        if now.duration_since(inner.last_purge) < self.purge_interval {
            return;
        }

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry.last_access, now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            inner.entries.remove(&id);
        }
        inner.last_purge = now;
    }
}
