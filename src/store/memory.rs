use std::sync::{Mutex, MutexGuard};

use super::{Standing, StoreError, TotalsStore, MAX_TOTAL};

/// In-process store; vector order is creation order
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Standing>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> Result<MutexGuard<'_, Vec<Standing>>, StoreError> {
        self.rows.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl TotalsStore for MemoryStore {
    fn get(&self, name: &str) -> Result<Option<u64>, StoreError> {
        Ok(self
            .rows()?
            .iter()
            .find(|row| row.name == name)
            .map(|row| row.total))
    }

    fn atomic_increment(&self, name: &str, delta: u64) -> Result<u64, StoreError> {
        let delta = delta.min(MAX_TOTAL);
        let mut rows = self.rows()?;
        match rows.iter_mut().find(|row| row.name == name) {
            Some(row) => {
                row.total = row.total.saturating_add(delta).min(MAX_TOTAL);
                Ok(row.total)
            }
            None => {
                rows.push(Standing::new(name, delta));
                Ok(delta)
            }
        }
    }

    fn list_all(&self) -> Result<Vec<Standing>, StoreError> {
        Ok(self.rows()?.clone())
    }

    fn ensure(&self, name: &str) -> Result<(), StoreError> {
        let mut rows = self.rows()?;
        if !rows.iter().any(|row| row.name == name) {
            rows.push(Standing::new(name, 0));
        }
        Ok(())
    }

    fn reset_all(&self) -> Result<(), StoreError> {
        for row in self.rows()?.iter_mut() {
            row.total = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn increment_creates_then_adds() {
        let store = MemoryStore::new();
        assert_eq!(store.get("Arno").unwrap(), None);
        assert_eq!(store.atomic_increment("Arno", 5).unwrap(), 5);
        assert_eq!(store.atomic_increment("Arno", 7).unwrap(), 12);
        assert_eq!(store.get("Arno").unwrap(), Some(12));
    }

    #[test]
    fn ensure_keeps_existing_total() {
        let store = MemoryStore::new();
        store.atomic_increment("Orso", 30).unwrap();
        store.ensure("Orso").unwrap();
        store.ensure("Simon").unwrap();
        assert_eq!(
            store.list_all().unwrap(),
            vec![Standing::new("Orso", 30), Standing::new("Simon", 0)]
        );
    }

    #[test]
    fn names_are_case_sensitive() {
        let store = MemoryStore::new();
        store.atomic_increment("arno", 1).unwrap();
        assert_eq!(store.get("Arno").unwrap(), None);
    }

    #[test]
    fn reset_zeroes_totals_in_place() {
        let store = MemoryStore::new();
        store.atomic_increment("Arno", 10).unwrap();
        store.atomic_increment("Orso", 20).unwrap();
        store.reset_all().unwrap();
        assert_eq!(
            store.list_all().unwrap(),
            vec![Standing::new("Arno", 0), Standing::new("Orso", 0)]
        );
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        store.ensure("Arno").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.atomic_increment("Arno", 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("Arno").unwrap(), Some(800));
    }

    #[test]
    fn increment_saturates_at_max_total() {
        let store = MemoryStore::new();
        assert_eq!(store.atomic_increment("Arno", u64::MAX).unwrap(), MAX_TOTAL);
        assert_eq!(store.atomic_increment("Arno", 1).unwrap(), MAX_TOTAL);
    }
}
