//! Memoized resolution with per-key coalescing.
//!
//! [`ResultCache`] fronts a pure loader function: concurrent requests for
//! the same key share one computation, and results are kept until evicted
//! according to a [`CachePolicy`]. [`BulkResolver`] resolves whole lists of
//! nullable keys through a cache, either one key at a time on the server or
//! as a single batched call for the misses on a client.

pub mod bulk;
pub mod result_cache;

pub use bulk::BulkResolver;
pub use result_cache::{CachePolicy, CacheStats, CacheValue, ResolveError, ResultCache};
