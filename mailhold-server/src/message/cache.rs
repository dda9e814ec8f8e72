//! Decomposition cache keyed by raw payload digest.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::DecomposeError;
use crate::mime::{decompose, DecomposedMessage};

/// LRU cache of decomposed messages.
///
/// Entries are keyed by the SHA-256 of the raw bytes, so a hit is always the
/// decomposition of byte-identical input. Cached values are shared and never
/// mutated. A capacity of zero disables caching.
pub struct DecompositionCache {
    entries: Option<Mutex<LruCache<String, Arc<DecomposedMessage>>>>,
}

impl DecompositionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|c| Mutex::new(LruCache::new(c))),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0)
    }

    /// Return the cached decomposition of `raw`, decomposing on a miss.
    ///
    /// Failures are not cached.
    pub fn get_or_decompose(&self, raw: &[u8]) -> Result<Arc<DecomposedMessage>, DecomposeError> {
        let Some(entries) = &self.entries else {
            return decompose(raw).map(Arc::new);
        };

        let key = payload_digest(raw);

        if let Some(hit) = lock(entries).get(&key) {
            debug!(digest = %key, "decompose_cache_hit");
            return Ok(Arc::clone(hit));
        }

        let decomposed = Arc::new(decompose(raw)?);
        lock(entries).put(key, Arc::clone(&decomposed));

        Ok(decomposed)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map(|e| lock(e).len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hex SHA-256 digest identifying a raw payload.
pub fn payload_digest(raw: &[u8]) -> String {
    hex::encode(Sha256::digest(raw))
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // entries are immutable Arcs, so a poisoned guard still holds a valid cache
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
