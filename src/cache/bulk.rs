use std::hash::Hash;

use tracing::{debug, info};

use crate::cache::result_cache::{CacheValue, ResolveError, ResultCache};

/// Resolves lists of nullable keys through a [`ResultCache`].
///
/// Output always has the same length and order as the input, and a `None`
/// key always yields `None` without any lookup.
pub struct BulkResolver<'a, K, V> {
    cache: &'a ResultCache<K, V>,
}

impl<'a, K, V> BulkResolver<'a, K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: CacheValue,
{
    #[must_use]
    pub fn new(cache: &'a ResultCache<K, V>) -> Self {
        Self { cache }
    }

    /// Resolve every key through the cache, one key at a time
    ///
    /// # Errors
    ///
    /// Returns the first loader error the cache does not suppress.
    pub fn resolve_all(&self, keys: &[Option<K>]) -> Result<Vec<Option<V>>, ResolveError> {
        let results = keys
            .iter()
            .map(|key| key.as_ref().map(|k| self.cache.get(k)).transpose())
            .collect::<Result<Vec<_>, _>>()?;

        info!("Resolved {} entries", results.iter().flatten().count());
        self.cache.log_stats();
        Ok(results)
    }

    /// Resolve keys with at most one batched call for the cache misses.
    ///
    /// `batch` receives the missing keys in their relative input order and
    /// must return one value per key. It is not called when every key is
    /// cached. Newly resolved values are added to the cache.
    ///
    /// # Errors
    ///
    /// Returns the batch call's error, or `ResolveError::BatchMismatch` if
    /// its reply has the wrong length.
    pub fn resolve_batched<F>(
        &self,
        keys: &[Option<K>],
        batch: F,
    ) -> Result<Vec<Option<V>>, ResolveError>
    where
        F: FnOnce(&[K]) -> Result<Vec<V>, ResolveError>,
    {
        let mut results: Vec<Option<V>> = Vec::with_capacity(keys.len());
        let mut missing_keys = Vec::new();
        let mut missing_slots = Vec::new();

        for (slot, key) in keys.iter().enumerate() {
            let cached = key.as_ref().and_then(|k| self.cache.get_if_present(k));
            if cached.is_none() {
                if let Some(k) = key {
                    missing_keys.push(k.clone());
                    missing_slots.push(slot);
                }
            }
            results.push(cached);
        }

        if missing_keys.is_empty() {
            debug!("All {} keys cached, no batch call", keys.len());
            return Ok(results);
        }

        debug!(
            "{} of {} keys missing from cache, calling batch",
            missing_keys.len(),
            keys.len()
        );
        let fetched = batch(&missing_keys)?;
        if fetched.len() != missing_keys.len() {
            return Err(ResolveError::BatchMismatch {
                sent: missing_keys.len(),
                received: fetched.len(),
            });
        }

        for ((slot, key), value) in missing_slots.into_iter().zip(missing_keys).zip(fetched) {
            self.cache.insert(key, value.clone());
            results[slot] = Some(value);
        }

        Ok(results)
    }
}
