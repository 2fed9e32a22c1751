use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// String-keyed cache of lazily built, never evicted values.
///
/// Each key owns a `OnceCell`, so concurrent first requests for the same key
/// run the factory once and every caller receives the same `Arc`. The map
/// lock is released before the factory runs; unrelated keys build in
/// parallel. A failed build leaves the cell empty and the next request
/// retries.
pub struct KernelCache<V> {
    label: &'static str,
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<V>>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> KernelCache<V> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get_or_compile<E, F>(&self, key: &str, factory: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let mut built = false;
        let value = cell.get_or_try_init(|| {
            built = true;
            factory().map(Arc::new)
        })?;

        if built {
            self.misses.fetch_add(1, Ordering::Relaxed);
            log::debug!("{} miss key={}", self.label, key);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("{} hit key={}", self.label, key);
        }
        Ok(value.clone())
    }

    /// Number of keys holding a built value.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|cell| cell.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counters(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn second_lookup_is_a_hit() {
        let cache: KernelCache<String> = KernelCache::new("test_cache");
        let first = cache
            .get_or_compile("f32f32", || Ok::<_, ()>("program".to_string()))
            .expect("first");
        let second = cache
            .get_or_compile("f32f32", || Err(()))
            .expect("second");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.counters(), (1, 1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_build_leaves_key_empty() {
        let cache: KernelCache<u32> = KernelCache::new("test_cache");
        let err = cache.get_or_compile("i32f32", || Err::<u32, _>("boom"));
        assert_eq!(err.err(), Some("boom"));
        assert!(cache.is_empty());

        let value = cache
            .get_or_compile("i32f32", || Ok::<_, &str>(7))
            .expect("retry");
        assert_eq!(*value, 7);
    }

    #[test]
    fn concurrent_first_use_builds_once() {
        let cache: Arc<KernelCache<usize>> = Arc::new(KernelCache::new("test_cache"));
        let builds = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let builds = Arc::clone(&builds);
                thread::spawn(move || {
                    cache
                        .get_or_compile("u32f32:lgamma", || {
                            builds.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(5));
                            Ok::<_, ()>(42)
                        })
                        .expect("value")
                })
            })
            .collect();
        let values: Vec<Arc<usize>> = handles
            .into_iter()
            .map(|h| h.join().expect("join"))
            .collect();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
        assert_eq!(cache.counters(), (7, 1));
    }
}
