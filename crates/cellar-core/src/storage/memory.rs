use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::debug;

use super::{NewSheet, SheetStore, StoredSheet};
use crate::document::Sheet;
use crate::error::{CellarError, Result};

/// Sheets held in a concurrent map for the life of the process.
#[derive(Debug)]
pub struct MemoryStore {
    sheets: DashMap<u64, StoredSheet>,
    next_id: AtomicU64,
    open: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            sheets: DashMap::new(),
            next_id: AtomicU64::new(1),
            open: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(CellarError::StoreClosed)
        }
    }
}

impl SheetStore for MemoryStore {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn create(&self, sheet: NewSheet) -> Result<StoredSheet> {
        self.ensure_open()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = StoredSheet {
            id,
            name: sheet.name,
            data: sheet.data,
        };
        self.sheets.insert(id, stored.clone());
        debug!(id, "created sheet");
        Ok(stored)
    }

    fn get(&self, id: u64) -> Result<Option<StoredSheet>> {
        self.ensure_open()?;
        Ok(self.sheets.get(&id).map(|entry| entry.value().clone()))
    }

    fn update(&self, id: u64, data: Sheet) -> Result<StoredSheet> {
        self.ensure_open()?;
        let mut entry = self.sheets.get_mut(&id).ok_or(CellarError::SheetNotFound(id))?;
        entry.data = data;
        debug!(id, "updated sheet");
        Ok(entry.value().clone())
    }

    fn delete(&self, id: u64) -> Result<()> {
        self.ensure_open()?;
        if self.sheets.remove(&id).is_some() {
            debug!(id, "deleted sheet");
        }
        Ok(())
    }

    fn ids(&self) -> Result<Vec<u64>> {
        self.ensure_open()?;
        let mut ids: Vec<u64> = self.sheets.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;
    use std::sync::Arc;

    #[test]
    fn test_closed_store_rejects_operations() {
        let store = MemoryStore::new();
        contract::closed_store_rejects_operations(&store);
    }

    #[test]
    fn test_crud_round_trip() {
        let mut store = MemoryStore::new();
        store.open().unwrap();
        contract::crud_round_trip(&store);
    }

    #[test]
    fn test_ids_not_reused_after_reopen() {
        let mut store = MemoryStore::new();
        contract::ids_not_reused_after_reopen(&mut store);
    }

    #[test]
    fn test_close_keeps_contents() {
        let mut store = MemoryStore::new();
        store.open().unwrap();
        let created = store
            .create(NewSheet {
                name: "kept".into(),
                data: Sheet::default(),
            })
            .unwrap();
        store.close().unwrap();
        store.open().unwrap();
        assert_eq!(store.get(created.id).unwrap(), Some(created));
    }

    #[test]
    fn test_concurrent_creates_get_distinct_ids() {
        let mut store = MemoryStore::new();
        store.open().unwrap();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .create(NewSheet {
                            name: format!("sheet {n}"),
                            data: Sheet::default(),
                        })
                        .unwrap()
                        .id
                })
            })
            .collect();
        let mut ids: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }
}
