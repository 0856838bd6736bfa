//! "Already authorized" flag storage.
//!
//! The gate never owns session state. It reads and sets one boolean per
//! visitor session through [`AuthFlagStore`], so hosts can plug in their own
//! session backend and tests can use [`InMemoryFlagStore`].
//!
//! The flag is monotonic in practice: the gate only ever sets it to `true`,
//! and setting it twice is the same as setting it once.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::{GateError, GateResult};

/// Opaque per-visitor session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a cookie value. Anything that is not a UUID is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.as_hyphenated(), f)
    }
}

/// Get/set capability over the per-session authorized flag.
pub trait AuthFlagStore: Send + Sync {
    /// Whether the session has already been let through.
    fn get(&self, id: &SessionId) -> GateResult<bool>;

    /// Record the flag for the session.
    fn set(&self, id: &SessionId, authorized: bool) -> GateResult<()>;
}

/// Default lifetime of an in-memory flag.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default number of sessions the in-memory store keeps.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct FlagEntry {
    authorized: bool,
    stored_at: Instant,
}

/// Process-local store backed by a `HashMap`.
///
/// Entries expire after `ttl` and are purged on the next write. When the
/// store is full the oldest entry is evicted, so it never holds more than
/// `max_entries` sessions.
#[derive(Debug)]
pub struct InMemoryFlagStore {
    flags: RwLock<HashMap<SessionId, FlagEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl InMemoryFlagStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }

    /// Create a store with a custom expiry and capacity.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            flags: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Number of sessions with a recorded flag, expired ones included
    /// until the next write purges them.
    pub fn len(&self) -> usize {
        self.flags.read().map(|flags| flags.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_live(&self, entry: &FlagEntry) -> bool {
        entry.stored_at.elapsed() < self.ttl
    }
}

impl Default for InMemoryFlagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthFlagStore for InMemoryFlagStore {
    fn get(&self, id: &SessionId) -> GateResult<bool> {
        let flags = self
            .flags
            .read()
            .map_err(|e| GateError::Internal(format!("Flag store lock poisoned: {e}")))?;
        Ok(flags
            .get(id)
            .filter(|entry| self.is_live(entry))
            .is_some_and(|entry| entry.authorized))
    }

    fn set(&self, id: &SessionId, authorized: bool) -> GateResult<()> {
        let mut flags = self
            .flags
            .write()
            .map_err(|e| GateError::Internal(format!("Flag store lock poisoned: {e}")))?;

        flags.retain(|_, entry| self.is_live(entry));

        if !flags.contains_key(id) && flags.len() >= self.max_entries {
            let oldest = flags
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| *key);
            if let Some(oldest) = oldest {
                flags.remove(&oldest);
            }
        }

        flags.insert(
            *id,
            FlagEntry {
                authorized,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }
}

/// A store bound to one session, as handed to the decision logic.
#[derive(Clone, Copy)]
pub struct SessionFlag<'a> {
    store: &'a dyn AuthFlagStore,
    id: SessionId,
}

impl<'a> SessionFlag<'a> {
    pub fn new(store: &'a dyn AuthFlagStore, id: SessionId) -> Self {
        Self { store, id }
    }

    pub fn is_set(&self) -> GateResult<bool> {
        self.store.get(&self.id)
    }

    /// Mark the session as authorized.
    pub fn mark(&self) -> GateResult<()> {
        self.store.set(&self.id, true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_roundtrips_through_display() {
        let id = SessionId::generate();
        assert_eq!(SessionId::parse(&id.to_string()), Some(id));
    }

    #[test]
    fn test_session_id_rejects_garbage() {
        assert!(SessionId::parse("").is_none());
        assert!(SessionId::parse("not-a-session").is_none());
    }

    #[test]
    fn test_unknown_session_is_not_authorized() {
        let store = InMemoryFlagStore::new();
        assert!(!store.get(&SessionId::generate()).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_twice_is_idempotent() {
        let store = InMemoryFlagStore::new();
        let flag = SessionFlag::new(&store, SessionId::generate());

        flag.mark().unwrap();
        flag.mark().unwrap();

        assert!(flag.is_set().unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = InMemoryFlagStore::new();
        let a = SessionId::generate();
        let b = SessionId::generate();

        store.set(&a, true).unwrap();
        assert!(store.get(&a).unwrap());
        assert!(!store.get(&b).unwrap());
    }

    #[test]
    fn test_store_is_bounded_by_capacity() {
        let store = InMemoryFlagStore::with_limits(DEFAULT_SESSION_TTL, 100);

        for _ in 0..1000 {
            store.set(&SessionId::generate(), true).unwrap();
        }

        assert_eq!(store.len(), 100);
    }

    #[test]
    fn test_full_store_evicts_oldest() {
        let store = InMemoryFlagStore::with_limits(DEFAULT_SESSION_TTL, 2);
        let first = SessionId::generate();
        let second = SessionId::generate();
        let third = SessionId::generate();

        store.set(&first, true).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        store.set(&second, true).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        store.set(&third, true).unwrap();

        assert!(!store.get(&first).unwrap());
        assert!(store.get(&second).unwrap());
        assert!(store.get(&third).unwrap());
    }

    #[test]
    fn test_refreshing_existing_session_does_not_evict() {
        let store = InMemoryFlagStore::with_limits(DEFAULT_SESSION_TTL, 1);
        let id = SessionId::generate();

        store.set(&id, true).unwrap();
        store.set(&id, true).unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.get(&id).unwrap());
    }

    #[test]
    fn test_expired_flag_is_not_authorized_and_purged() {
        let store = InMemoryFlagStore::with_limits(Duration::ZERO, 10);
        let id = SessionId::generate();

        store.set(&id, true).unwrap();
        assert!(!store.get(&id).unwrap());

        store.set(&SessionId::generate(), true).unwrap();
        assert_eq!(store.len(), 1);
    }
}
