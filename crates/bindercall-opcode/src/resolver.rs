use std::sync::{Mutex, PoisonError};

use tracing::{debug, trace};

use crate::cache::LruCache;
use crate::config::ResolverConfig;
use crate::provider::{cache_key, OpcodeProvider};
use crate::table::OpcodeTable;

/// Resolves interface/method pairs to transaction codes, with memoization.
///
/// Codes are constants of the target OS image, so a cached entry never
/// changes. The cache lock is held across the provider lookup, so
/// concurrent misses on the same key consult the provider once.
pub struct TransactionResolver<P = OpcodeTable> {
    provider: P,
    cache: Mutex<LruCache<String, u32>>,
}

impl<P: OpcodeProvider> TransactionResolver<P> {
    /// Create a resolver with the default cache capacity.
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, ResolverConfig::default())
    }

    /// Create a resolver with explicit configuration.
    pub fn with_config(provider: P, config: ResolverConfig) -> Self {
        Self {
            provider,
            cache: Mutex::new(LruCache::new(config.capacity)),
        }
    }

    /// Resolve the code of `method` on `interface`.
    ///
    /// Returns `None` when the code cannot be determined, whatever the
    /// reason; the reason is logged at debug level.
    pub fn resolve(&self, interface: &str, method: &str) -> Option<u32> {
        let key = cache_key(interface, method);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(code) = cache.get(&key) {
            trace!(%key, code, "opcode cache hit");
            return Some(code);
        }

        match self.provider.lookup(interface, method) {
            Ok(code) => {
                if let Some(evicted) = cache.put(key.clone(), code) {
                    trace!(%evicted, "opcode cache eviction");
                }
                debug!(%key, code, "resolved opcode");
                Some(code)
            }
            Err(failure) => {
                debug!(%key, %failure, "cannot resolve opcode");
                None
            }
        }
    }

    /// Whether a code for the pair is currently cached.
    pub fn is_cached(&self, interface: &str, method: &str) -> bool {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(cache_key(interface, method).as_str())
    }

    /// Number of cached codes.
    pub fn cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop all cached codes.
    pub fn clear(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::provider::LookupFailure;

    struct CountingProvider {
        table: OpcodeTable,
        lookups: AtomicUsize,
    }

    impl OpcodeProvider for CountingProvider {
        fn lookup(&self, interface: &str, method: &str) -> Result<u32, LookupFailure> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.table.lookup(interface, method)
        }
    }

    fn counting(table: OpcodeTable) -> Arc<CountingProvider> {
        Arc::new(CountingProvider {
            table,
            lookups: AtomicUsize::new(0),
        })
    }

    #[test]
    fn first_resolution_is_memoized() {
        let provider = counting(OpcodeTable::new().with("com.example.IFoo", "foo", 7));
        let resolver = TransactionResolver::new(provider.clone());

        assert_eq!(resolver.resolve("com.example.IFoo", "foo"), Some(7));
        assert_eq!(resolver.resolve("com.example.IFoo", "foo"), Some(7));
        assert_eq!(provider.lookups.load(Ordering::SeqCst), 1);
        assert!(resolver.is_cached("com.example.IFoo", "foo"));
    }

    #[test]
    fn misses_are_not_cached() {
        let provider = counting(OpcodeTable::new());
        let resolver = TransactionResolver::new(provider.clone());

        assert_eq!(resolver.resolve("com.example.IFoo", "nope"), None);
        assert_eq!(resolver.resolve("com.example.IFoo", "nope"), None);
        assert_eq!(provider.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(resolver.cached(), 0);
    }

    #[test]
    fn capacity_bounds_the_cache() {
        let table = OpcodeTable::new()
            .with("a.I", "one", 1)
            .with("a.I", "two", 2)
            .with("a.I", "three", 3);
        let resolver =
            TransactionResolver::with_config(table, ResolverConfig::default().with_capacity(2));

        resolver.resolve("a.I", "one");
        resolver.resolve("a.I", "two");
        resolver.resolve("a.I", "one");
        resolver.resolve("a.I", "three");

        assert_eq!(resolver.cached(), 2);
        assert!(resolver.is_cached("a.I", "one"));
        assert!(!resolver.is_cached("a.I", "two"));
    }

    #[test]
    fn clear_forces_fresh_lookup() {
        let provider = counting(OpcodeTable::new().with("a.I", "m", 4));
        let resolver = TransactionResolver::new(provider.clone());
        resolver.resolve("a.I", "m");
        resolver.clear();
        resolver.resolve("a.I", "m");
        assert_eq!(provider.lookups.load(Ordering::SeqCst), 2);
    }
}
