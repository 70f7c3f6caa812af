use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::result::MatchResult;
use crate::matching::classifier::ClassifierError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Batch reply has {received} results for {sent} requests")]
    BatchMismatch { sent: usize, received: usize },
}

impl ResolveError {
    /// Short name of the error variant, used in result issues
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lookup(_) => "LookupError",
            Self::Remote(_) => "RemoteError",
            Self::BatchMismatch { .. } => "BatchMismatch",
        }
    }
}

impl From<ClassifierError> for ResolveError {
    fn from(e: ClassifierError) -> Self {
        ResolveError::Lookup(format!("{}: {e}", e.kind()))
    }
}

/// A value that can be held in a [`ResultCache`]
pub trait CacheValue: Clone + Send + Sync + 'static {
    /// Whether this value records the absence of a result
    fn is_negative(&self) -> bool;

    /// The negative value standing in for a suppressed loader error
    fn from_error(error: &ResolveError) -> Self;
}

impl CacheValue for MatchResult {
    fn is_negative(&self) -> bool {
        !self.success
    }

    fn from_error(error: &ResolveError) -> Self {
        Self::error(error.kind(), &error.to_string())
    }
}

/// Eviction and error handling policy for a [`ResultCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CachePolicy {
    /// Maximum number of entries kept
    pub capacity: u64,

    /// Keep entries until evicted by capacity alone
    pub eternal: bool,

    /// Entry lifetime when not eternal
    pub time_to_live_secs: u64,

    /// Keep negative results
    pub cache_negatives: bool,

    /// Turn loader errors into negative values instead of returning them
    pub suppress_errors: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            eternal: false,
            time_to_live_secs: 3600,
            cache_negatives: true,
            suppress_errors: false,
        }
    }
}

impl CachePolicy {
    #[must_use]
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_cache_negatives(mut self, cache_negatives: bool) -> Self {
        self.cache_negatives = cache_negatives;
        self
    }

    #[must_use]
    pub fn with_suppress_errors(mut self, suppress_errors: bool) -> Self {
        self.suppress_errors = suppress_errors;
        self
    }
}

/// Request counters for a cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub requests: u64,
    pub loads: u64,
}

impl CacheStats {
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.requests.saturating_sub(self.loads)
    }
}

/// Reasons a computed value leaves the cache untouched
enum Uncached<V> {
    Negative(V),
    Failed(ResolveError),
}

type Loader<K, V> = dyn Fn(&K) -> Result<V, ResolveError> + Send + Sync;

/// A bounded memo over a pure loader.
///
/// At most one computation runs per key at a time; every concurrent caller
/// for that key receives the outcome of the shared computation. Keys do not
/// block each other.
pub struct ResultCache<K, V> {
    name: &'static str,
    cache: Cache<K, V>,
    loader: Arc<Loader<K, V>>,
    policy: CachePolicy,
    requests: AtomicU64,
    loads: AtomicU64,
}

impl<K, V> ResultCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: CacheValue,
{
    pub fn new<F>(name: &'static str, policy: CachePolicy, loader: F) -> Self
    where
        F: Fn(&K) -> Result<V, ResolveError> + Send + Sync + 'static,
    {
        let mut builder = Cache::builder().max_capacity(policy.capacity);
        if !policy.eternal {
            builder = builder.time_to_live(Duration::from_secs(policy.time_to_live_secs));
        }

        debug!(
            "Initializing {name} cache (capacity {}, eternal {})",
            policy.capacity, policy.eternal
        );

        Self {
            name,
            cache: builder.build(),
            loader: Arc::new(loader),
            policy,
            requests: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Get the value for a key, computing it if absent
    ///
    /// # Errors
    ///
    /// Returns the loader's error when `suppress_errors` is off. The error is
    /// not cached, so the next call retries.
    pub fn get(&self, key: &K) -> Result<V, ResolveError> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let outcome = self.cache.try_get_with(key.clone(), || {
            self.loads.fetch_add(1, Ordering::Relaxed);
            let value = match (self.loader)(key) {
                Ok(value) => value,
                Err(e) if self.policy.suppress_errors => {
                    debug!("{} cache suppressed error: {e}", self.name);
                    V::from_error(&e)
                }
                Err(e) => return Err(Uncached::Failed(e)),
            };
            if value.is_negative() && !self.policy.cache_negatives {
                return Err(Uncached::Negative(value));
            }
            Ok(value)
        });

        match outcome {
            Ok(value) => Ok(value),
            Err(shared) => match shared.as_ref() {
                Uncached::Negative(value) => Ok(value.clone()),
                Uncached::Failed(e) => Err(e.clone()),
            },
        }
    }

    /// The cached value for a key, without computing it
    #[must_use]
    pub fn get_if_present(&self, key: &K) -> Option<V> {
        self.cache.get(key)
    }

    /// Store a value computed elsewhere, following the negative caching policy
    pub fn insert(&self, key: K, value: V) {
        if value.is_negative() && !self.policy.cache_negatives {
            return;
        }
        self.cache.insert(key, value);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            requests: self.requests.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
        }
    }

    /// Log hit and miss counts at debug level
    pub fn log_stats(&self) {
        let stats = self.stats();
        debug!(
            "{} cache: {} requests, {} hits, {} loads",
            self.name,
            stats.requests,
            stats.hits(),
            stats.loads
        );
    }
}
