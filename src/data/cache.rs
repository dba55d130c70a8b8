//! Single-flight memoization cache.
//!
//! Each key owns a slot that is initialized at most once. Concurrent callers
//! for the same key block on the slot while the first one computes the value.
//! A failed computation leaves the slot empty so the next call runs it again.

use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

pub struct MemoCache<K, V> {
    slots: Mutex<HashMap<K, Arc<OnceCell<Arc<V>>>>>,
}

impl<K, V> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, computing it with `init` on first use.
    pub fn get_or_try_init<E, F>(&self, key: &K, init: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(key.clone()).or_default().clone()
        };

        // The map lock is released here; only callers of this key wait below
        if let Some(value) = slot.get() {
            debug!(?key, "cache hit");
            return Ok(value.clone());
        }

        slot.get_or_try_init(|| {
            debug!(?key, "populating cache");
            init().map(Arc::new)
        })
        .cloned()
    }

    /// Whether `key` holds a computed value.
    pub fn contains(&self, key: &K) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).is_some_and(|slot| slot.get().is_some())
    }

    /// Drop every cached value.
    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn value_is_computed_once() {
        let cache: MemoCache<String, usize> = MemoCache::new();
        let calls = AtomicUsize::new(0);
        let key = "landings.csv".to_string();

        for _ in 0..3 {
            let value = cache
                .get_or_try_init(&key, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(42)
                })
                .unwrap();
            assert_eq!(*value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&key));
    }

    #[test]
    fn failure_is_not_cached() {
        let cache: MemoCache<u32, u32> = MemoCache::new();

        let first = cache.get_or_try_init(&1, || Err("unreadable"));
        assert_eq!(first.unwrap_err(), "unreadable");
        assert!(!cache.contains(&1));

        let second = cache.get_or_try_init(&1, || Ok::<_, &str>(7)).unwrap();
        assert_eq!(*second, 7);
    }

    #[test]
    fn concurrent_callers_share_one_computation() {
        let cache: Arc<MemoCache<u32, u32>> = Arc::new(MemoCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    *cache
                        .get_or_try_init(&5, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok::<_, ()>(25)
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 25);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_forgets_values() {
        let cache: MemoCache<u32, u32> = MemoCache::new();
        cache.get_or_try_init(&1, || Ok::<_, ()>(1)).unwrap();
        cache.clear();
        assert!(!cache.contains(&1));
    }
}
