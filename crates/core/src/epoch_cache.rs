//! Single-slot epoch cache.
//!
//! Holds the cache or dataset for the most recently requested epoch (or seed).
//! Readers share the published value through an `Arc`; builds are serialized
//! behind a separate mutex so concurrent callers asking for the same new epoch
//! block on one in-flight build instead of repeating it.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use crate::error::Result;

pub struct EpochCache<K, V> {
    name: &'static str,
    slot: RwLock<Option<(K, Arc<V>)>>,
    build: Mutex<()>,
}

impl<K, V> EpochCache<K, V>
where
    K: Clone + PartialEq + fmt::Debug,
{
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: RwLock::new(None),
            build: Mutex::new(()),
        }
    }

    /// Value for `key` if it is the one currently published.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some((k, v)) if k == key => Some(Arc::clone(v)),
            _ => None,
        }
    }

    /// Key of the published value.
    pub fn key(&self) -> Option<K> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|(k, _)| k.clone())
    }

    /// Return the value for `key`, building and publishing it if the slot holds
    /// another key. A failed build leaves the previous value in place.
    pub fn get_or_build<F>(&self, key: K, build: F) -> Result<Arc<V>>
    where
        F: FnOnce(&K) -> Result<V>,
    {
        if let Some(v) = self.get(&key) {
            tracing::debug!(cache = self.name, ?key, "cache hit");
            return Ok(v);
        }

        let _guard = self.build.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have published while we waited.
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }

        let start = Instant::now();
        let value = Arc::new(build(&key)?);
        tracing::info!(
            cache = self.name,
            ?key,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built epoch cache"
        );

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some((key, Arc::clone(&value)));
        Ok(value)
    }

    /// Drop the published value. Holders of an `Arc` keep theirs alive.
    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if let Some((key, _)) = slot.take() {
            tracing::debug!(cache = self.name, ?key, "cache invalidated");
        }
    }
}

impl<K, V> fmt::Debug for EpochCache<K, V>
where
    K: Clone + PartialEq + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpochCache")
            .field("name", &self.name)
            .field("key", &self.key())
            .finish()
    }
}
