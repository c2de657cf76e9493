//! One result set per session

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use adoq_domain::{CompiledQuery, FilterSpec, SessionId, WorkItem};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What produced a cached result set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheOrigin {
    /// Structured filter, when the fetch came from one
    pub filter: Option<FilterSpec>,

    /// The compiled query that was executed
    pub query: Option<CompiledQuery>,
}

impl CacheOrigin {
    /// Origin of a fetch compiled from a filter
    pub fn from_filter(filter: FilterSpec, query: CompiledQuery) -> Self {
        Self {
            filter: Some(filter),
            query: Some(query),
        }
    }

    /// Origin of a fetch run from a query alone
    pub fn from_query(query: CompiledQuery) -> Self {
        Self {
            filter: None,
            query: Some(query),
        }
    }
}

/// A cached result set
///
/// Immutable once stored. Readers get an `Arc` to the whole entry, so a
/// reader always sees one complete set.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    items: Arc<[WorkItem]>,
    origin: CacheOrigin,
    created_at: Instant,
    description: String,
}

impl CacheEntry {
    /// New entry; the creation time is stamped when it is stored
    pub fn new(items: Vec<WorkItem>, origin: CacheOrigin, description: impl Into<String>) -> Self {
        Self {
            items: items.into(),
            origin,
            created_at: Instant::now(),
            description: description.into(),
        }
    }

    /// The records, in fetch order
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Shared handle to the records
    pub fn shared_items(&self) -> Arc<[WorkItem]> {
        Arc::clone(&self.items)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// What produced this set
    pub fn origin(&self) -> &CacheOrigin {
        &self.origin
    }

    /// When the entry was stored
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Human-readable source description
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Snapshot of a session's slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    /// Records in the entry
    pub item_count: usize,

    /// Time since the entry was stored
    pub age: Duration,

    /// Whether `get` would treat the entry as absent
    pub expired: bool,

    /// Source description
    pub description: String,
}

/// Per-session result cache
///
/// Exactly one slot per session. `put` replaces the slot wholesale under a
/// write lock; `get` clones the `Arc` under a read lock. Expired entries
/// read as absent but stay in the slot until replaced or invalidated.
#[derive(Debug)]
pub struct ResultCache {
    entries: RwLock<HashMap<SessionId, Arc<CacheEntry>>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    /// Create a cache on the system clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache on a specific clock
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            clock,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        match self.config.ttl() {
            Some(ttl) => now.saturating_duration_since(entry.created_at) > ttl,
            None => false,
        }
    }

    /// Store an entry, replacing the session's previous one
    pub fn put(&self, session: SessionId, mut entry: CacheEntry) -> Arc<CacheEntry> {
        entry.created_at = self.clock.now();
        let entry = Arc::new(entry);

        let previous = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session, Arc::clone(&entry));

        info!(
            session = %session,
            items = entry.len(),
            replaced = previous.is_some(),
            "Cached result set"
        );
        entry
    }

    /// The session's entry, unless missing or expired
    pub fn get(&self, session: SessionId) -> Option<Arc<CacheEntry>> {
        let entry = self.peek(session)?;

        if self.is_expired(&entry, self.clock.now()) {
            debug!(session = %session, "Cached entry expired");
            return None;
        }
        Some(entry)
    }

    /// The session's entry regardless of age
    ///
    /// For callers that need to know what an expired entry was, e.g. to
    /// re-run its filter. Analysis must go through [`get`](Self::get).
    pub fn peek(&self, session: SessionId) -> Option<Arc<CacheEntry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&session)
            .cloned()
    }

    /// Remove the session's entry; true if there was one
    pub fn invalidate(&self, session: SessionId) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session)
            .is_some();
        if removed {
            debug!(session = %session, "Invalidated cached entry");
        }
        removed
    }

    /// Describe the session's slot, expired or not
    pub fn status(&self, session: SessionId) -> Option<CacheStatus> {
        let entry = self.peek(session)?;

        let now = self.clock.now();
        Some(CacheStatus {
            item_count: entry.len(),
            age: now.saturating_duration_since(entry.created_at),
            expired: self.is_expired(&entry, now),
            description: entry.description.clone(),
        })
    }

    /// Number of occupied slots, expired ones included
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no session has a slot
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn items(prefix: &str, n: u64) -> Vec<WorkItem> {
        (1..=n)
            .map(|i| WorkItem::new(i, "Bug", format!("{} {}", prefix, i), "Active"))
            .collect()
    }

    fn entry(prefix: &str, n: u64) -> CacheEntry {
        CacheEntry::new(items(prefix, n), CacheOrigin::default(), prefix)
    }

    fn cache_with_ttl(ttl_secs: i64) -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ResultCache::with_clock(CacheConfig { ttl_secs }, clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_put_replaces() {
        let cache = ResultCache::default();
        let session = SessionId::new();

        cache.put(session, entry("A", 3));
        cache.put(session, entry("B", 2));

        let got = cache.get(session).unwrap();
        assert_eq!(got.len(), 2);
        assert!(got.items().iter().all(|i| i.title.starts_with("B ")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let cache = ResultCache::default();
        let (a, b) = (SessionId::new(), SessionId::new());
        cache.put(a, entry("A", 1));
        assert!(cache.get(b).is_none());
        assert!(!cache.invalidate(b));
        assert!(cache.get(a).is_some());
    }

    #[test]
    fn test_ttl_boundary() {
        let (cache, clock) = cache_with_ttl(60);
        let session = SessionId::new();
        cache.put(session, entry("A", 1));

        assert!(cache.get(session).is_some());
        clock.advance(Duration::from_secs(60));
        assert!(cache.get(session).is_some());
        clock.advance(Duration::from_millis(1));
        assert!(cache.get(session).is_none());

        // Retained until replaced
        let status = cache.status(session).unwrap();
        assert!(status.expired);
        assert_eq!(cache.len(), 1);
        assert!(cache.peek(session).is_some());

        cache.put(session, entry("B", 1));
        assert!(cache.get(session).is_some());
    }

    #[test]
    fn test_unlimited_ttl() {
        for ttl in [0, -1] {
            let (cache, clock) = cache_with_ttl(ttl);
            let session = SessionId::new();
            cache.put(session, entry("A", 1));
            clock.advance(Duration::from_secs(10 * 365 * 24 * 3600));
            assert!(cache.get(session).is_some());

            assert!(cache.invalidate(session));
            assert!(cache.get(session).is_none());
        }
    }

    #[test]
    fn test_status_reports_age() {
        let (cache, clock) = cache_with_ttl(600);
        let session = SessionId::new();
        assert!(cache.status(session).is_none());

        cache.put(session, entry("sprint bugs", 4));
        clock.advance(Duration::from_secs(90));

        let status = cache.status(session).unwrap();
        assert_eq!(status.item_count, 4);
        assert_eq!(status.age, Duration::from_secs(90));
        assert!(!status.expired);
        assert_eq!(status.description, "sprint bugs");
    }

    #[test]
    fn test_reader_snapshot_survives_replace() {
        let cache = ResultCache::default();
        let session = SessionId::new();
        cache.put(session, entry("A", 3));

        let snapshot = cache.get(session).unwrap();
        cache.put(session, entry("B", 1));

        assert_eq!(snapshot.len(), 3);
        assert_eq!(cache.get(session).unwrap().len(), 1);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::clock::ManualClock;
    use proptest::prelude::*;

    proptest! {
        /// Property: an entry is visible exactly while its age is within the TTL
        #[test]
        fn test_visibility_matches_ttl(ttl in 1i64..1000, elapsed in 0u64..2000) {
            let clock = Arc::new(ManualClock::new());
            let cache = ResultCache::with_clock(CacheConfig { ttl_secs: ttl }, clock.clone());
            let session = SessionId::new();
            cache.put(session, CacheEntry::new(Vec::new(), CacheOrigin::default(), "p"));

            clock.advance(Duration::from_secs(elapsed));
            prop_assert_eq!(cache.get(session).is_some(), elapsed as i64 <= ttl);
        }
    }
}
