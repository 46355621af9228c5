use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// A get-or-create map whose builder runs at most once per key.
///
/// Readers only take the read lock. The first caller for a key takes the write
/// lock just long enough to insert an empty cell; the value itself is built
/// outside the map lock, inside the cell's `OnceLock`, so concurrent first
/// callers for the same key block on the cell and then observe the single value.
#[derive(Debug)]
pub(crate) struct OnceMap<K, V> {
    cells: RwLock<HashMap<K, Arc<OnceLock<V>>>>,
}

impl<K: Eq + Hash, V: Clone> OnceMap<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<V> {
        let cells = self.cells.read().unwrap_or_else(PoisonError::into_inner);
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    pub(crate) fn get_or_init(&self, key: K, init: impl FnOnce() -> V) -> V {
        if let Some(v) = self.get(&key) {
            return v;
        }

        let cell = {
            let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cells.entry(key).or_default())
        };
        cell.get_or_init(init).clone()
    }

    pub(crate) fn len(&self) -> usize {
        let cells = self.cells.read().unwrap_or_else(PoisonError::into_inner);
        cells.values().filter(|cell| cell.get().is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builder_runs_once_under_contention() {
        let map: Arc<OnceMap<&'static str, Arc<String>>> = Arc::new(OnceMap::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let map = Arc::clone(&map);
                let builds = Arc::clone(&builds);
                std::thread::spawn(move || {
                    map.get_or_init("k", || {
                        builds.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        Arc::new("v".to_string())
                    })
                })
            })
            .collect();

        let values: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
        assert_eq!(map.len(), 1);
    }
}
