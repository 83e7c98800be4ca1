//! Copy-on-write storage shared by the syntax, parser, renderer and macro registries.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Read-mostly value that is swapped wholesale on update.
///
/// Readers clone an `Arc` snapshot and never observe a half-applied
/// registration; writers copy the current value, mutate the copy and
/// publish it.
#[derive(Debug)]
pub struct CopyOnWrite<T> {
    current: RwLock<Arc<T>>,
}

impl<T: Clone> CopyOnWrite<T> {
    /// Wraps an initial value.
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    /// Returns the current snapshot.
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&read(&self.current, "load"))
    }

    /// Applies `f` to a copy of the current value and publishes the result.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = write(&self.current, "update");
        let mut next = T::clone(&guard);
        let result = f(&mut next);
        *guard = Arc::new(next);
        result
    }
}

impl<T: Clone + Default> Default for CopyOnWrite<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

fn read<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("registry {}: recovered from poisoned lock", op);
            poisoned.into_inner()
        }
    }
}

fn write<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("registry {}: recovered from poisoned lock", op);
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_snapshot_survives_update() {
        let cell: CopyOnWrite<HashMap<String, u32>> = CopyOnWrite::default();
        cell.update(|map| map.insert("a".into(), 1));
        let before = cell.load();
        cell.update(|map| map.insert("b".into(), 2));

        assert_eq!(before.len(), 1);
        assert_eq!(cell.load().len(), 2);
    }

    #[test]
    fn test_concurrent_readers() {
        let cell = Arc::new(CopyOnWrite::new(vec![1, 2, 3]));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || {
                    cell.update(|v| v.push(10 + i));
                    cell.load().len()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap() >= 4);
        }
        assert_eq!(cell.load().len(), 7);
    }
}
