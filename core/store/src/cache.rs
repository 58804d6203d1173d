use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Key of a cache entry: opaque bytes assembled by the codec.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(pub Vec<u8>);

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl From<Vec<u8>> for CacheKey {
    fn from(bytes: Vec<u8>) -> CacheKey {
        CacheKey(bytes)
    }
}

impl AsRef<[u8]> for CacheKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Value written under a cache key. `None` writes a negative entry,
/// recording that the row does not exist; `Some` stores an encoded row,
/// which may be empty.
pub type CacheValue = Option<Vec<u8>>;

/// Outcome of a cache lookup: the three cache states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// No entry under the key.
    Miss,
    /// A negative entry: the row is known not to exist.
    Negative,
    /// An encoded row, possibly empty.
    Row(Vec<u8>),
}

impl CacheLookup {
    /// The lookup state of a stored value.
    pub fn from_value(value: CacheValue) -> CacheLookup {
        match value {
            None => CacheLookup::Negative,
            Some(bytes) => CacheLookup::Row(bytes),
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, CacheLookup::Miss)
    }
}

/// One access to a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheAccess {
    /// Look up the entry under `key`. A missing entry is not an error.
    Get { key: CacheKey },
    /// Create or replace the entry under `key`. No TTL is attached.
    Set { key: CacheKey, value: CacheValue },
}

/// Driver of a look-aside cache.
///
/// Implementations may block on the network, must not retain the borrowed
/// access past the call, and report failures as [`anyhow::Error`].
pub trait CacheProvider: Send + Sync {
    /// Performs one access. A get yields `Some` lookup state; a set yields
    /// `None`.
    fn access(&self, access: &CacheAccess) -> anyhow::Result<Option<CacheLookup>>;

    /// Performs several independent accesses, one result per access in
    /// input order. Implementations with a batched transport override this
    /// to pipeline the round trips.
    fn access_slice(&self, accesses: &[CacheAccess]) -> Vec<anyhow::Result<Option<CacheLookup>>> {
        accesses.iter().map(|access| self.access(access)).collect()
    }
}

/// In-memory [`CacheProvider`] over an [`LruCache`], unbounded by default.
///
/// Negative entries are stored distinctly from empty rows, so the three
/// lookup states survive a round trip through this provider.
pub struct MemoryCache {
    entries: Mutex<LruCache<CacheKey, CacheValue>>,
}

impl MemoryCache {
    /// A cache that never evicts.
    pub fn unbounded() -> MemoryCache {
        MemoryCache { entries: Mutex::new(LruCache::unbounded()) }
    }

    /// A cache evicting the least recently used entry beyond `cap`.
    pub fn with_cap(cap: NonZeroUsize) -> MemoryCache {
        MemoryCache { entries: Mutex::new(LruCache::new(cap)) }
    }

    /// Number of stored entries, negative entries included.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheProvider for MemoryCache {
    fn access(&self, access: &CacheAccess) -> anyhow::Result<Option<CacheLookup>> {
        let mut entries = self.entries.lock().unwrap();
        match access {
            CacheAccess::Get { key } => {
                let lookup = match entries.get(key) {
                    None => CacheLookup::Miss,
                    Some(value) => CacheLookup::from_value(value.clone()),
                };
                Ok(Some(lookup))
            }
            CacheAccess::Set { key, value } => {
                entries.put(key.clone(), value.clone());
                Ok(None)
            }
        }
    }
}
