//! Single-slot holder for the active configuration value.

use std::sync::Arc;

use parking_lot::RwLock;

/// Holds the current configuration, or nothing before the first load.
///
/// Values are swapped as a whole `Arc`, so a reader either sees the previous
/// value or the new one.
pub struct ConfigCell<T> {
    value: RwLock<Option<Arc<T>>>,
}

impl<T> ConfigCell<T> {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    /// Returns the current value, if one has been loaded.
    pub fn get(&self) -> Option<Arc<T>> {
        self.value.read().clone()
    }

    /// Replaces the current value.
    pub fn set(&self, value: Arc<T>) {
        *self.value.write() = Some(value);
    }
}

impl<T> Default for ConfigCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_empty() {
        let cell: ConfigCell<String> = ConfigCell::new();
        assert!(cell.get().is_none());
    }

    #[test]
    fn set_replaces_wholesale() {
        let cell = ConfigCell::new();
        cell.set(Arc::new(vec![1, 2, 3]));
        let first = cell.get().unwrap();

        cell.set(Arc::new(vec![4]));
        assert_eq!(*cell.get().unwrap(), vec![4]);
        // Earlier readers keep the value they saw.
        assert_eq!(*first, vec![1, 2, 3]);
    }

    #[test]
    fn concurrent_readers_never_see_torn_values() {
        // Every written value is a vector whose elements all equal its length.
        let cell = Arc::new(ConfigCell::new());

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    let mut last_len = 0;
                    for _ in 0..2_000 {
                        if let Some(v) = cell.get() {
                            let v: &Vec<usize> = &v;
                            assert!(v.iter().all(|x| *x == v.len()));
                            assert!(v.len() >= last_len, "observed an older value");
                            last_len = v.len();
                        }
                    }
                })
            })
            .collect();

        for n in 1..=200 {
            cell.set(Arc::new(vec![n; n]));
        }

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(cell.get().unwrap().len(), 200);
    }
}
